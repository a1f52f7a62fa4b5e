//! Species image lookup orchestration.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Local;
use tracing::{debug, info};
use uuid::Uuid;

use super::freshness::FreshnessPolicy;
use super::session_memo::SessionMemo;
use crate::domain::entities::{ImageRecord, SpeciesKey};
use crate::domain::errors::CacheError;
use crate::domain::ports::ImageProviderPort;
use crate::infrastructure::blacklist::Blacklist;
use crate::infrastructure::store::SqliteImageStore;
use crate::infrastructure::taxonomy::Taxonomy;

/// Resolves species images through the memo, the persistent store, and the
/// bound upstream provider, in that order.
///
/// Lookups run within the calling task; there is no background refresh and
/// no single-flight de-duplication, so a cold cache under concurrent load
/// can issue redundant upstream calls for the same key. The store's bounded
/// lock wait is the only concurrency control.
pub struct SpeciesImageService {
    store: Arc<SqliteImageStore>,
    provider: Arc<dyn ImageProviderPort>,
    blacklist: Arc<Blacklist>,
    taxonomy: Arc<Taxonomy>,
    freshness: FreshnessPolicy,
    // Epoch base is drawn per instance, so memos stamped by an older service
    // never match and clear themselves on first use.
    epoch: AtomicU64,
}

impl std::fmt::Debug for SpeciesImageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeciesImageService")
            .field("epoch", &self.epoch.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl SpeciesImageService {
    /// Wires the orchestrator to its collaborators.
    #[must_use]
    pub fn new(
        store: Arc<SqliteImageStore>,
        provider: Arc<dyn ImageProviderPort>,
        blacklist: Arc<Blacklist>,
        taxonomy: Arc<Taxonomy>,
    ) -> Self {
        if provider.cache_was_reset() {
            info!("Provider reset the image cache, session memos will be discarded");
        }
        Self {
            store,
            provider,
            blacklist,
            taxonomy,
            freshness: FreshnessPolicy::new(Uuid::new_v4().as_u64_pair().0),
            epoch: AtomicU64::new(Uuid::new_v4().as_u64_pair().0),
        }
    }

    /// Resolves the illustrative image for a scientific name.
    ///
    /// The memoized outcome, positive or negative, is returned without any
    /// store or network access. Otherwise the store is consulted, stale or
    /// blacklisted records are refreshed through the provider, and the
    /// outcome is memoized before returning.
    ///
    /// # Errors
    /// Returns `StoreBusy` when the store lock wait expires; callers treat
    /// it as transient and retry on the next render pass.
    pub async fn get_image(
        &self,
        memo: &mut SessionMemo,
        sci_name: &str,
    ) -> Result<Option<ImageRecord>, CacheError> {
        let key = self.memo_key(sci_name);
        memo.sync_epoch(self.epoch.load(Ordering::Acquire));
        if let Some(outcome) = memo.get(&key) {
            return Ok(outcome.clone());
        }

        let mut cached = self.store.get(sci_name)?;
        if let Some(record) = &cached {
            if self.blacklist.contains(&record.external_id) {
                debug!(
                    sci_name,
                    external_id = %record.external_id,
                    "Cached image is blacklisted, evicting"
                );
                self.store.delete(sci_name)?;
                cached = None;
            }
        }

        let today = Local::now().date_naive();
        let resolved = match cached {
            Some(record) if self.freshness.is_fresh(&record, today) => Some(record),
            stale => {
                if let Some(record) = &stale {
                    debug!(
                        sci_name,
                        age_days = record.age_days(today),
                        "Cached image expired, refreshing"
                    );
                }
                match self.provider.fetch(sci_name).await {
                    Some(record) => {
                        self.store.put(&record)?;
                        // Read-after-write: the returned shape always
                        // matches what is now persisted.
                        self.store.get(sci_name)?
                    }
                    None => {
                        debug!(sci_name, "No image available upstream");
                        None
                    }
                }
            }
        };

        memo.insert(key, resolved.clone());
        Ok(resolved)
    }

    /// Permanently bans an external photo id.
    ///
    /// Appends to the durable blacklist, evicts the affected record from the
    /// store, and moves the cache epoch so every session memo clears on its
    /// next use.
    ///
    /// # Errors
    /// Returns `StoreBusy` when the store lock wait expires, or `Io` when
    /// the blacklist file cannot be appended to.
    pub fn blacklist_image(&self, external_id: &str) -> Result<(), CacheError> {
        self.blacklist.add(external_id)?;
        if let Some(record) = self.store.find_by_external_id(external_id)? {
            info!(
                external_id,
                sci_name = %record.sci_name,
                "Evicting blacklisted record"
            );
            self.store.delete(&record.sci_name)?;
        }
        self.epoch.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// External photo page for a resolved record, for attribution links.
    #[must_use]
    pub fn photo_page_url(&self, record: &ImageRecord) -> String {
        self.provider.photo_page_url(record)
    }

    fn memo_key(&self, sci_name: &str) -> SpeciesKey {
        let display = self.taxonomy.common_name(sci_name).unwrap_or(sci_name);
        SpeciesKey::from_common_name(display)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::MockImageProviderPort;
    use chrono::{Days, NaiveDate};
    use std::collections::HashMap;

    fn taxonomy() -> Arc<Taxonomy> {
        let mut labels = HashMap::new();
        labels.insert(
            "Turdus migratorius".to_string(),
            "American Robin".to_string(),
        );
        labels.insert(
            "Poecile atricapillus".to_string(),
            "Black-capped Chickadee".to_string(),
        );
        Arc::new(Taxonomy::from_labels(labels))
    }

    fn blacklist(dir: &tempfile::TempDir) -> Arc<Blacklist> {
        Arc::new(Blacklist::load(dir.path().join("blacklist.txt")).unwrap())
    }

    fn record(sci_name: &str, external_id: &str, created_at: NaiveDate) -> ImageRecord {
        ImageRecord {
            sci_name: sci_name.to_string(),
            common_name: "Some Bird".to_string(),
            image_url: format!("https://example.com/{external_id}.jpg"),
            title: String::new(),
            external_id: external_id.to_string(),
            author_url: "https://example.com/people/a".to_string(),
            license_url: "https://example.com/license".to_string(),
            created_at,
        }
    }

    fn mock_provider() -> MockImageProviderPort {
        let mut provider = MockImageProviderPort::new();
        provider.expect_cache_was_reset().return_const(false);
        provider
            .expect_photo_page_url()
            .returning(|record| format!("https://example.com/photos/{}", record.external_id));
        provider
    }

    fn service(
        provider: MockImageProviderPort,
        store: Arc<SqliteImageStore>,
        blacklist: Arc<Blacklist>,
    ) -> SpeciesImageService {
        SpeciesImageService::new(store, Arc::new(provider), blacklist, taxonomy())
    }

    fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    #[tokio::test]
    async fn test_cold_lookup_fetches_persists_and_memoizes() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteImageStore::in_memory().unwrap());

        let mut provider = mock_provider();
        let fetched = record("Turdus migratorius", "42", today());
        let returned = fetched.clone();
        provider
            .expect_fetch()
            .times(1)
            .returning(move |_| Some(returned.clone()));

        let service = service(provider, store.clone(), blacklist(&dir));
        let mut memo = SessionMemo::default();

        let first = service
            .get_image(&mut memo, "Turdus migratorius")
            .await
            .unwrap();
        assert_eq!(first, Some(fetched.clone()));

        // Upsert correctness: exactly one persisted record, matching ids.
        assert_eq!(store.len().unwrap(), 1);
        let stored = store.get("Turdus migratorius").unwrap().unwrap();
        assert_eq!(stored.external_id, "42");

        // Second call within the session is answered by the memo alone; the
        // mock would panic on a second fetch.
        let second = service
            .get_image(&mut memo, "Turdus migratorius")
            .await
            .unwrap();
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn test_memo_hit_skips_the_store_entirely() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteImageStore::in_memory().unwrap());

        let mut provider = mock_provider();
        let fetched = record("Turdus migratorius", "42", today());
        provider
            .expect_fetch()
            .times(1)
            .returning(move |_| Some(fetched.clone()));

        let service = service(provider, store.clone(), blacklist(&dir));
        let mut memo = SessionMemo::default();

        let first = service
            .get_image(&mut memo, "Turdus migratorius")
            .await
            .unwrap();

        // Remove the row behind the memo's back; a memo hit must not notice.
        store.delete("Turdus migratorius").unwrap();
        let second = service
            .get_image(&mut memo, "Turdus migratorius")
            .await
            .unwrap();
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn test_negative_outcome_is_memoized() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteImageStore::in_memory().unwrap());

        let mut provider = mock_provider();
        provider.expect_fetch().times(1).returning(|_| None);

        let service = service(provider, store.clone(), blacklist(&dir));
        let mut memo = SessionMemo::default();

        assert_eq!(
            service
                .get_image(&mut memo, "Turdus migratorius")
                .await
                .unwrap(),
            None
        );
        assert_eq!(
            service
                .get_image(&mut memo, "Turdus migratorius")
                .await
                .unwrap(),
            None
        );
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_fresh_record_is_served_without_a_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteImageStore::in_memory().unwrap());
        store
            .put(&record("Turdus migratorius", "42", today()))
            .unwrap();

        // No expect_fetch: any provider call panics the test.
        let service = service(mock_provider(), store.clone(), blacklist(&dir));
        let mut memo = SessionMemo::default();

        let resolved = service
            .get_image(&mut memo, "Turdus migratorius")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.external_id, "42");
    }

    #[tokio::test]
    async fn test_stale_record_is_refreshed() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteImageStore::in_memory().unwrap());
        let stale_date = today().checked_sub_days(Days::new(40)).unwrap();
        store
            .put(&record("Turdus migratorius", "42", stale_date))
            .unwrap();

        let mut provider = mock_provider();
        let fresh = record("Turdus migratorius", "43", today());
        provider
            .expect_fetch()
            .times(1)
            .returning(move |_| Some(fresh.clone()));

        let service = service(provider, store.clone(), blacklist(&dir));
        let mut memo = SessionMemo::default();

        let resolved = service
            .get_image(&mut memo, "Turdus migratorius")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.external_id, "43");
        let stored = store.get("Turdus migratorius").unwrap().unwrap();
        assert_eq!(stored.external_id, "43");
    }

    #[tokio::test]
    async fn test_stale_record_with_failed_refresh_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteImageStore::in_memory().unwrap());
        let stale_date = today().checked_sub_days(Days::new(40)).unwrap();
        store
            .put(&record("Turdus migratorius", "42", stale_date))
            .unwrap();

        let mut provider = mock_provider();
        provider.expect_fetch().times(1).returning(|_| None);

        let service = service(provider, store.clone(), blacklist(&dir));
        let mut memo = SessionMemo::default();

        assert_eq!(
            service
                .get_image(&mut memo, "Turdus migratorius")
                .await
                .unwrap(),
            None
        );
        // The failed refresh must not mutate the store.
        let stored = store.get("Turdus migratorius").unwrap().unwrap();
        assert_eq!(stored.external_id, "42");
    }

    #[tokio::test]
    async fn test_blacklisted_cached_record_is_evicted_and_refetched() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteImageStore::in_memory().unwrap());
        store
            .put(&record("Poecile atricapillus", "123", today()))
            .unwrap();

        let blacklist = blacklist(&dir);
        blacklist.add("123").unwrap();

        let mut provider = mock_provider();
        let replacement = record("Poecile atricapillus", "456", today());
        provider
            .expect_fetch()
            .times(1)
            .returning(move |_| Some(replacement.clone()));

        let service = service(provider, store.clone(), blacklist);
        let mut memo = SessionMemo::default();

        let resolved = service
            .get_image(&mut memo, "Poecile atricapillus")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.external_id, "456");
        assert_eq!(store.find_by_external_id("123").unwrap(), None);
    }

    #[tokio::test]
    async fn test_blacklisted_record_without_replacement_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteImageStore::in_memory().unwrap());
        store
            .put(&record("Poecile atricapillus", "123", today()))
            .unwrap();

        let blacklist = blacklist(&dir);
        blacklist.add("123").unwrap();

        let mut provider = mock_provider();
        provider.expect_fetch().times(1).returning(|_| None);

        let service = service(provider, store.clone(), blacklist);
        let mut memo = SessionMemo::default();

        assert_eq!(
            service
                .get_image(&mut memo, "Poecile atricapillus")
                .await
                .unwrap(),
            None
        );
        assert!(store.get("Poecile atricapillus").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_blacklist_image_evicts_and_clears_memos() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteImageStore::in_memory().unwrap());

        let mut provider = mock_provider();
        let first = record("Poecile atricapillus", "123", today());
        let second = record("Poecile atricapillus", "456", today());
        let mut outcomes = vec![second, first];
        provider
            .expect_fetch()
            .times(2)
            .returning(move |_| outcomes.pop());

        let service = service(provider, store.clone(), blacklist(&dir));
        let mut memo = SessionMemo::default();

        let resolved = service
            .get_image(&mut memo, "Poecile atricapillus")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.external_id, "123");

        service.blacklist_image("123").unwrap();
        assert_eq!(store.find_by_external_id("123").unwrap(), None);

        // The memoized outcome is gone; the next lookup refetches and never
        // serves the banned id again.
        let resolved = service
            .get_image(&mut memo, "Poecile atricapillus")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.external_id, "456");
    }

    #[tokio::test]
    async fn test_photo_page_url_delegates_to_the_provider() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteImageStore::in_memory().unwrap());

        let service = service(mock_provider(), store, blacklist(&dir));
        let rec = record("Turdus migratorius", "42", today());
        assert_eq!(
            service.photo_page_url(&rec),
            "https://example.com/photos/42"
        );
    }
}
