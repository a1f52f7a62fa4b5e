//! Jittered record freshness policy.

use chrono::NaiveDate;
use sha2::{Digest, Sha256};

use crate::domain::entities::ImageRecord;

/// Lower bound of the freshness band, in days.
pub const FRESHNESS_MIN_DAYS: i64 = 15;

/// Upper bound of the freshness band, in days.
pub const FRESHNESS_MAX_DAYS: i64 = 25;

/// Per-record time-to-live drawn from a band instead of a fixed value.
///
/// The budget is derived from the record key and a per-process seed, so
/// cached species expire spread out across the band rather than all at once,
/// and freshness checks are reproducible for the lifetime of one service
/// instance.
#[derive(Debug, Clone)]
pub struct FreshnessPolicy {
    min_days: i64,
    max_days: i64,
    seed: u64,
}

impl FreshnessPolicy {
    /// Creates the standard 15–25 day policy.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::with_band(seed, FRESHNESS_MIN_DAYS, FRESHNESS_MAX_DAYS)
    }

    /// Creates a policy over a custom band.
    #[must_use]
    pub fn with_band(seed: u64, min_days: i64, max_days: i64) -> Self {
        debug_assert!(0 <= min_days && min_days <= max_days);
        Self {
            min_days,
            max_days,
            seed,
        }
    }

    /// Freshness budget in days for a scientific name.
    #[must_use]
    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    pub fn budget_days(&self, sci_name: &str) -> i64 {
        let mut hasher = Sha256::new();
        hasher.update(self.seed.to_le_bytes());
        hasher.update(sci_name.as_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        let draw = u64::from_le_bytes(bytes);

        let span = (self.max_days - self.min_days + 1) as u64;
        self.min_days + (draw % span) as i64
    }

    /// Whether a record is still within its freshness budget at `today`.
    #[must_use]
    pub fn is_fresh(&self, record: &ImageRecord, today: NaiveDate) -> bool {
        record.age_days(today) <= self.budget_days(&record.sci_name)
    }
}
