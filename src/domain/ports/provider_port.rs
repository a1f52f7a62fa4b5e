//! Upstream image provider port definition.

use async_trait::async_trait;

use crate::domain::entities::ImageRecord;

/// Port for upstream photo sources.
///
/// Implementations resolve a scientific name to a freshly fetched record.
/// Any upstream failure — unreachable endpoint, malformed JSON, missing
/// field, no eligible candidate — is an absent result, never an error, so
/// the orchestrator has a single "no image available" outcome to propagate.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageProviderPort: Send + Sync {
    /// Fetches a fresh record for a scientific name from the upstream source.
    async fn fetch(&self, sci_name: &str) -> Option<ImageRecord>;

    /// External photo-page link for a record, used for attribution.
    fn photo_page_url(&self, record: &ImageRecord) -> String;

    /// True when constructing this provider invalidated the persistent
    /// cache (identity binding changed).
    fn cache_was_reset(&self) -> bool {
        false
    }
}
