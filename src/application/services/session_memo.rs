//! Per-session lookup memoization.

use std::num::NonZeroUsize;

use lru::LruCache;
use tracing::{debug, trace};

use crate::domain::entities::{ImageRecord, SpeciesKey};

/// Default maximum number of species memoized per session.
pub const DEFAULT_MEMO_CAPACITY: usize = 256;

/// Ephemeral memoization layer in front of the persistent store.
///
/// Owned by exactly one request session and passed into each lookup, so a
/// page rendering many detections of the same species touches the store and
/// the network at most once. Memoizes the "no image" outcome too. Epoch
/// stamped: when the owning service's epoch moves (blacklist mutation,
/// identity-binding reset) the memo clears itself on next use.
pub struct SessionMemo {
    entries: LruCache<SpeciesKey, Option<ImageRecord>>,
    epoch: u64,
    hits: u64,
    misses: u64,
}

impl std::fmt::Debug for SessionMemo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionMemo")
            .field("len", &self.entries.len())
            .field("epoch", &self.epoch)
            .finish_non_exhaustive()
    }
}

impl SessionMemo {
    /// Creates a memo bounded to `capacity` species.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(cap),
            epoch: 0,
            hits: 0,
            misses: 0,
        }
    }

    /// Drops every memoized outcome.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of memoized species.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is memoized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hit/miss counts for this session.
    #[must_use]
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    /// Aligns the memo with the service's epoch, clearing stale entries.
    pub(crate) fn sync_epoch(&mut self, epoch: u64) {
        if self.epoch != epoch {
            if !self.entries.is_empty() {
                debug!(
                    dropped = self.entries.len(),
                    "Cache epoch moved, clearing session memo"
                );
            }
            self.entries.clear();
            self.epoch = epoch;
        }
    }

    pub(crate) fn get(&mut self, key: &SpeciesKey) -> Option<&Option<ImageRecord>> {
        let outcome = self.entries.get(key);
        if outcome.is_some() {
            self.hits += 1;
            trace!(key = %key, "Session memo hit");
        } else {
            self.misses += 1;
            trace!(key = %key, "Session memo miss");
        }
        outcome
    }

    pub(crate) fn insert(&mut self, key: SpeciesKey, outcome: Option<ImageRecord>) {
        self.entries.put(key, outcome);
    }
}

impl Default for SessionMemo {
    fn default() -> Self {
        Self::new(DEFAULT_MEMO_CAPACITY)
    }
}
