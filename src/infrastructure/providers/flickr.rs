//! Photo-sharing service provider.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::dto::{
    FlickrFindUserResponse, FlickrInfoResponse, FlickrLicensesResponse, FlickrPhoto,
    FlickrSearchResponse,
};
use super::{encode_spaces, get_json};
use crate::domain::entities::{IdentityBinding, ImageRecord};
use crate::domain::errors::{CacheError, FetchError};
use crate::domain::ports::ImageProviderPort;
use crate::infrastructure::blacklist::Blacklist;
use crate::infrastructure::config::FlickrConfig;
use crate::infrastructure::store::SqliteImageStore;
use crate::infrastructure::taxonomy::Taxonomy;

const DEFAULT_API_BASE: &str = "https://api.flickr.com";

/// A photo that must never be served, independent of the blacklist file.
const BANNED_PHOTO_ID: &str = "4892923285";

/// License whitelist applied to unscoped searches, pre-encoded.
const LICENSE_WHITELIST: &str = "2%2C3%2C4%2C5%2C6%2C9";

/// Search text suffix that keeps unscoped results on topic.
const UNSCOPED_TEXT_SUFFIX: &str = " bird";

/// Whether searches run across the public corpus or one curated account.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SearchScope {
    Unscoped,
    Account { uid: String },
}

/// Upstream provider backed by a photo-sharing service.
///
/// Construction runs the cache-epoch check: when the configured account
/// filter no longer matches the stored identity binding, the whole
/// persistent cache is reset and the new binding is resolved and persisted.
pub struct FlickrProvider {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    scope: SearchScope,
    blacklist: Arc<Blacklist>,
    taxonomy: Arc<Taxonomy>,
    // License-code lookup table, fetched once per process.
    licenses: Mutex<HashMap<String, String>>,
    was_reset: bool,
}

impl std::fmt::Debug for FlickrProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlickrProvider")
            .field("scope", &self.scope)
            .field("was_reset", &self.was_reset)
            .finish_non_exhaustive()
    }
}

impl FlickrProvider {
    /// Binds the provider against the store's identity binding.
    ///
    /// # Errors
    /// Returns error if the store cannot be read or reset. Upstream failures
    /// during account resolution degrade to an unscoped search instead.
    pub async fn bind(
        config: &FlickrConfig,
        client: reqwest::Client,
        store: &SqliteImageStore,
        blacklist: Arc<Blacklist>,
        taxonomy: Arc<Taxonomy>,
    ) -> Result<Self, CacheError> {
        Self::bind_with_base(DEFAULT_API_BASE, config, client, store, blacklist, taxonomy).await
    }

    /// Binds against a custom API base URL.
    ///
    /// # Errors
    /// Returns error if the store cannot be read or reset.
    pub async fn bind_with_base(
        api_base: impl Into<String>,
        config: &FlickrConfig,
        client: reqwest::Client,
        store: &SqliteImageStore,
        blacklist: Arc<Blacklist>,
        taxonomy: Arc<Taxonomy>,
    ) -> Result<Self, CacheError> {
        let api_base = api_base.into();
        let filter = config.filter_email.clone().unwrap_or_default();
        let today = Local::now().date_naive();

        let mut was_reset = false;
        let binding = match store.get_binding()? {
            Some(binding) if binding.matches(&filter) => Some(binding),
            prior => {
                info!(
                    old_filter = %prior.map(|b| b.filter_value).unwrap_or_default(),
                    new_filter = %filter,
                    "Identity binding changed, resetting image cache"
                );
                store.reset()?;
                was_reset = true;

                if filter.is_empty() {
                    let binding = IdentityBinding::unscoped(today);
                    store.put_binding(&binding)?;
                    Some(binding)
                } else {
                    match Self::resolve_uid(&client, &api_base, &config.api_key, &filter).await {
                        Ok(uid) => {
                            let binding = IdentityBinding::new(filter.clone(), uid, today);
                            store.put_binding(&binding)?;
                            Some(binding)
                        }
                        Err(e) => {
                            // Binding left absent so the next construction
                            // retries the lookup.
                            warn!(
                                filter = %filter,
                                error = %e,
                                "Could not resolve account filter, searching unscoped"
                            );
                            None
                        }
                    }
                }
            }
        };

        let scope = match binding {
            Some(binding) if binding.is_scoped() => SearchScope::Account {
                uid: binding.external_uid,
            },
            _ => SearchScope::Unscoped,
        };

        Ok(Self {
            client,
            api_base,
            api_key: config.api_key.clone(),
            scope,
            blacklist,
            taxonomy,
            licenses: Mutex::new(HashMap::new()),
            was_reset,
        })
    }

    async fn resolve_uid(
        client: &reqwest::Client,
        api_base: &str,
        api_key: &str,
        email: &str,
    ) -> Result<String, FetchError> {
        let url = format!(
            "{api_base}/services/rest/?method=flickr.people.findByEmail&api_key={api_key}\
             &find_email={}&format=json&nojsoncallback=1",
            encode_spaces(email)
        );
        let response: FlickrFindUserResponse = get_json(client, &url).await?;
        response
            .user
            .map(|user| user.nsid)
            .ok_or_else(|| FetchError::malformed("account lookup returned no user"))
    }

    fn search_url(&self, common_name: &str) -> String {
        let mut url = format!(
            "{}/services/rest/?method=flickr.photos.search&api_key={}&text={}",
            self.api_base,
            self.api_key,
            encode_spaces(common_name)
        );
        match &self.scope {
            SearchScope::Unscoped => {
                url.push_str(&encode_spaces(UNSCOPED_TEXT_SUFFIX));
                url.push_str("&sort=relevance&license=");
                url.push_str(LICENSE_WHITELIST);
                url.push_str("&orientation=square,portrait");
            }
            SearchScope::Account { uid } => {
                url.push_str("&sort=relevance&user_id=");
                url.push_str(uid);
            }
        }
        url.push_str("&per_page=5&media=photos&format=json&nojsoncallback=1");
        url
    }

    /// First search candidate that is neither banned nor blacklisted.
    fn first_allowed(&self, candidates: Vec<FlickrPhoto>) -> Option<FlickrPhoto> {
        candidates
            .into_iter()
            .find(|photo| photo.id != BANNED_PHOTO_ID && !self.blacklist.contains(&photo.id))
    }

    async fn photo_license_id(&self, photo_id: &str) -> Result<String, FetchError> {
        let url = format!(
            "{}/services/rest/?method=flickr.photos.getInfo&api_key={}&photo_id={photo_id}\
             &format=json&nojsoncallback=1",
            self.api_base, self.api_key
        );
        let response: FlickrInfoResponse = get_json(&self.client, &url).await?;
        response
            .photo
            .map(|photo| photo.license)
            .ok_or_else(|| FetchError::malformed("photo info response missing photo"))
    }

    async fn license_url(&self, license_id: &str) -> Result<String, FetchError> {
        if let Some(url) = self.licenses.lock().get(license_id) {
            return Ok(url.clone());
        }

        let url = format!(
            "{}/services/rest/?method=flickr.photos.licenses.getInfo&api_key={}\
             &format=json&nojsoncallback=1",
            self.api_base, self.api_key
        );
        let response: FlickrLicensesResponse = get_json(&self.client, &url).await?;
        let table: HashMap<String, String> = response
            .licenses
            .map(|list| {
                list.license
                    .into_iter()
                    .map(|license| (license.id, license.url))
                    .collect()
            })
            .ok_or_else(|| FetchError::malformed("license table response missing licenses"))?;

        let mut cache = self.licenses.lock();
        *cache = table;
        cache
            .get(license_id)
            .cloned()
            .ok_or_else(|| FetchError::malformed(format!("unknown license id {license_id}")))
    }

    async fn fetch_inner(&self, sci_name: &str) -> Result<ImageRecord, FetchError> {
        let common_name = self
            .taxonomy
            .common_name(sci_name)
            .ok_or_else(|| FetchError::unknown_species(sci_name))?
            .to_string();

        let search_url = self.search_url(&common_name);
        let response: FlickrSearchResponse = get_json(&self.client, &search_url).await?;
        let candidates = response.photos.map(|page| page.photo).unwrap_or_default();
        let photo = self
            .first_allowed(candidates)
            .ok_or(FetchError::NoCandidate)?;

        let license_id = self.photo_license_id(&photo.id).await?;
        let license_url = self.license_url(&license_id).await?;

        Ok(ImageRecord {
            sci_name: sci_name.to_string(),
            common_name,
            image_url: format!(
                "https://farm{}.static.flickr.com/{}/{}_{}.jpg",
                photo.farm, photo.server, photo.id, photo.secret
            ),
            title: photo.title,
            external_id: photo.id,
            author_url: format!("https://flickr.com/people/{}", photo.owner),
            license_url,
            created_at: Local::now().date_naive(),
        })
    }
}

#[async_trait]
impl ImageProviderPort for FlickrProvider {
    async fn fetch(&self, sci_name: &str) -> Option<ImageRecord> {
        match self.fetch_inner(sci_name).await {
            Ok(record) => Some(record),
            Err(FetchError::NoCandidate) => {
                debug!(sci_name, "No eligible photo candidate");
                None
            }
            Err(e) => {
                warn!(sci_name, error = %e, "Photo search failed");
                None
            }
        }
    }

    fn photo_page_url(&self, record: &ImageRecord) -> String {
        format!(
            "{}/{}",
            record.author_url.replace("/people/", "/photos/"),
            record.external_id
        )
    }

    fn cache_was_reset(&self) -> bool {
        self.was_reset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn taxonomy() -> Arc<Taxonomy> {
        let mut labels = HashMap::new();
        labels.insert(
            "Turdus migratorius".to_string(),
            "American Robin".to_string(),
        );
        Arc::new(Taxonomy::from_labels(labels))
    }

    fn blacklist(dir: &tempfile::TempDir) -> Arc<Blacklist> {
        Arc::new(Blacklist::load(dir.path().join("blacklist.txt")).unwrap())
    }

    fn unscoped_config() -> FlickrConfig {
        FlickrConfig {
            api_key: "test-key".to_string(),
            filter_email: None,
        }
    }

    async fn bind_unscoped(
        store: &SqliteImageStore,
        blacklist: Arc<Blacklist>,
    ) -> FlickrProvider {
        FlickrProvider::bind(
            &unscoped_config(),
            reqwest::Client::new(),
            store,
            blacklist,
            taxonomy(),
        )
        .await
        .unwrap()
    }

    fn photo(id: &str) -> FlickrPhoto {
        FlickrPhoto {
            id: id.to_string(),
            owner: "9@N00".to_string(),
            secret: "abc".to_string(),
            server: "65535".to_string(),
            farm: 66,
            title: "a robin".to_string(),
        }
    }

    #[tokio::test]
    async fn test_first_bind_writes_unscoped_binding() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteImageStore::in_memory().unwrap();

        let provider = bind_unscoped(&store, blacklist(&dir)).await;
        assert!(provider.cache_was_reset());
        assert_eq!(provider.scope, SearchScope::Unscoped);

        let binding = store.get_binding().unwrap().unwrap();
        assert!(binding.matches(""));
    }

    #[tokio::test]
    async fn test_rebind_with_same_filter_keeps_cache() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteImageStore::in_memory().unwrap();

        let _ = bind_unscoped(&store, blacklist(&dir)).await;
        let provider = bind_unscoped(&store, blacklist(&dir)).await;
        assert!(!provider.cache_was_reset());
    }

    #[tokio::test]
    async fn test_filter_change_resets_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteImageStore::in_memory().unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();

        store
            .put_binding(&IdentityBinding::new("old@example.com", "1@N00", today))
            .unwrap();
        store
            .put(&ImageRecord {
                sci_name: "Turdus migratorius".to_string(),
                common_name: "American Robin".to_string(),
                image_url: "https://example.com/1.jpg".to_string(),
                title: String::new(),
                external_id: "1".to_string(),
                author_url: "https://flickr.com/people/9@N00".to_string(),
                license_url: String::new(),
                created_at: today,
            })
            .unwrap();

        let provider = bind_unscoped(&store, blacklist(&dir)).await;
        assert!(provider.cache_was_reset());
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_stored_scoped_binding_scopes_the_search() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteImageStore::in_memory().unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();

        store
            .put_binding(&IdentityBinding::new("curator@example.com", "77@N00", today))
            .unwrap();

        let config = FlickrConfig {
            api_key: "test-key".to_string(),
            filter_email: Some("curator@example.com".to_string()),
        };
        let provider = FlickrProvider::bind(
            &config,
            reqwest::Client::new(),
            &store,
            blacklist(&dir),
            taxonomy(),
        )
        .await
        .unwrap();

        assert!(!provider.cache_was_reset());
        let url = provider.search_url("American Robin");
        assert!(url.contains("user_id=77@N00"));
        assert!(!url.contains("license="));
        assert!(!url.contains("%20bird"));
    }

    #[tokio::test]
    async fn test_unscoped_search_url_filters_licenses() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteImageStore::in_memory().unwrap();

        let provider = bind_unscoped(&store, blacklist(&dir)).await;
        let url = provider.search_url("American Robin");
        assert!(url.contains("text=American%20Robin%20bird"));
        assert!(url.contains("license=2%2C3%2C4%2C5%2C6%2C9"));
        assert!(url.contains("orientation=square,portrait"));
        assert!(url.contains("per_page=5"));
    }

    #[tokio::test]
    async fn test_first_allowed_skips_banned_and_blacklisted() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteImageStore::in_memory().unwrap();
        let blacklist = blacklist(&dir);
        blacklist.add("200").unwrap();

        let provider = bind_unscoped(&store, blacklist).await;
        let picked = provider
            .first_allowed(vec![photo(BANNED_PHOTO_ID), photo("200"), photo("300")])
            .unwrap();
        assert_eq!(picked.id, "300");

        assert!(
            provider
                .first_allowed(vec![photo(BANNED_PHOTO_ID), photo("200")])
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_fetch_unknown_species_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteImageStore::in_memory().unwrap();

        let provider = bind_unscoped(&store, blacklist(&dir)).await;
        assert!(provider.fetch("Corvus corax").await.is_none());
    }

    #[tokio::test]
    async fn test_photo_page_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteImageStore::in_memory().unwrap();
        let provider = bind_unscoped(&store, blacklist(&dir)).await;

        let record = ImageRecord {
            sci_name: "Turdus migratorius".to_string(),
            common_name: "American Robin".to_string(),
            image_url: "https://farm66.static.flickr.com/65535/100_abc.jpg".to_string(),
            title: String::new(),
            external_id: "100".to_string(),
            author_url: "https://flickr.com/people/9@N00".to_string(),
            license_url: String::new(),
            created_at: NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
        };
        assert_eq!(
            provider.photo_page_url(&record),
            "https://flickr.com/photos/9@N00/100"
        );
    }
}
