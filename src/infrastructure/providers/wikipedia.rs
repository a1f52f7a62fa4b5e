//! Encyclopedia media provider.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;
use regex::Regex;
use tracing::{debug, warn};

use super::dto::{WikiMetadataResponse, WikiSummaryResponse};
use super::get_json;
use crate::domain::entities::ImageRecord;
use crate::domain::errors::FetchError;
use crate::domain::ports::ImageProviderPort;
use crate::infrastructure::taxonomy::Taxonomy;

const DEFAULT_WIKI_BASE: &str = "https://en.wikipedia.org";
const DEFAULT_COMMONS_BASE: &str = "https://commons.wikimedia.org";

/// Originals wider than this are swapped for a thumbnail rendition.
const MAX_INLINE_WIDTH: u32 = 1024;

/// Upstream provider backed by an encyclopedia's media repository.
///
/// Resolves the page summary for the binomial name, takes its lead image,
/// and pulls author/license metadata from the media repository. The record's
/// external id is the scientific name itself; blacklisting it suppresses the
/// page's image.
pub struct WikipediaProvider {
    client: reqwest::Client,
    wiki_base: String,
    commons_base: String,
    taxonomy: Arc<Taxonomy>,
    author_href: Regex,
}

impl std::fmt::Debug for WikipediaProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WikipediaProvider").finish_non_exhaustive()
    }
}

impl WikipediaProvider {
    /// Creates a provider against the default public endpoints.
    #[must_use]
    pub fn new(client: reqwest::Client, taxonomy: Arc<Taxonomy>) -> Self {
        Self::with_bases(DEFAULT_WIKI_BASE, DEFAULT_COMMONS_BASE, client, taxonomy)
    }

    /// Creates a provider against custom base URLs.
    #[must_use]
    pub fn with_bases(
        wiki_base: impl Into<String>,
        commons_base: impl Into<String>,
        client: reqwest::Client,
        taxonomy: Arc<Taxonomy>,
    ) -> Self {
        Self {
            client,
            wiki_base: wiki_base.into(),
            commons_base: commons_base.into(),
            taxonomy,
            author_href: Regex::new(r#"href="(http\S*)""#).expect("valid author href pattern"),
        }
    }

    async fn fetch_inner(&self, sci_name: &str) -> Result<ImageRecord, FetchError> {
        let page_title = sci_name.replace(' ', "_");
        let summary_url = format!("{}/api/rest_v1/page/summary/{page_title}", self.wiki_base);
        let summary: WikiSummaryResponse = get_json(&self.client, &summary_url).await?;

        let original = summary.originalimage.ok_or(FetchError::NoCandidate)?;
        let image_name = original
            .source
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| FetchError::malformed("image source has no file name"))?
            .to_string();

        let metadata_url = format!(
            "{}/w/api.php?action=query&titles=File:{image_name}\
             &prop=imageinfo&iiprop=extmetadata%7Csize&format=json",
            self.commons_base
        );
        let metadata: WikiMetadataResponse = get_json(&self.client, &metadata_url).await?;
        let pages = metadata
            .query
            .map(|query| query.pages)
            .ok_or_else(|| FetchError::malformed("metadata response missing pages"))?;
        let info = pages
            .values()
            .find_map(|page| page.imageinfo.first())
            .ok_or_else(|| FetchError::malformed("metadata response missing imageinfo"))?;

        let ext = info.extmetadata.as_ref();
        let author_url = ext
            .and_then(|meta| meta.artist.as_ref())
            .and_then(|artist| self.extract_href(&artist.value))
            .unwrap_or_else(|| self.file_page_url(&original.source));
        let license_url = ext
            .and_then(|meta| meta.license_url.as_ref())
            .map(|license| license.value.clone())
            .unwrap_or_else(|| self.file_page_url(&original.source));

        let image_url = if info.width > MAX_INLINE_WIDTH {
            thumbnail_url(&original.source, &image_name)
        } else {
            original.source.clone()
        };

        // Falls back to the page title when the station's labels file does
        // not know the species.
        let common_name = self
            .taxonomy
            .common_name(sci_name)
            .map_or_else(|| summary.title.clone(), ToString::to_string);

        Ok(ImageRecord {
            sci_name: sci_name.to_string(),
            common_name,
            image_url,
            title: summary.title,
            external_id: sci_name.to_string(),
            author_url,
            license_url,
            created_at: Local::now().date_naive(),
        })
    }

    fn extract_href(&self, artist_html: &str) -> Option<String> {
        self.author_href
            .captures(artist_html)
            .map(|captures| captures[1].to_string())
    }

    /// Media description page for an image URL, used for attribution
    /// fallbacks and as the external photo page.
    fn file_page_url(&self, image_url: &str) -> String {
        let image_name = if image_url.contains("/commons/thumb/") {
            let parts: Vec<&str> = image_url.split('/').collect();
            parts
                .len()
                .checked_sub(2)
                .and_then(|i| parts.get(i))
                .copied()
                .unwrap_or_default()
        } else {
            image_url.rsplit('/').next().unwrap_or_default()
        };
        format!("{}/wiki/File:{image_name}", self.wiki_base)
    }
}

/// Thumbnail rendition URL for an oversized original.
fn thumbnail_url(image_url: &str, image_name: &str) -> String {
    format!(
        "{}/{MAX_INLINE_WIDTH}px-{image_name}",
        image_url.replacen("/commons/", "/commons/thumb/", 1)
    )
}

#[async_trait]
impl ImageProviderPort for WikipediaProvider {
    async fn fetch(&self, sci_name: &str) -> Option<ImageRecord> {
        match self.fetch_inner(sci_name).await {
            Ok(record) => Some(record),
            Err(FetchError::NoCandidate) => {
                debug!(sci_name, "Page has no lead image");
                None
            }
            Err(e) => {
                warn!(sci_name, error = %e, "Page summary fetch failed");
                None
            }
        }
    }

    fn photo_page_url(&self, record: &ImageRecord) -> String {
        self.file_page_url(&record.image_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn provider() -> WikipediaProvider {
        WikipediaProvider::new(
            reqwest::Client::new(),
            Arc::new(Taxonomy::from_labels(HashMap::new())),
        )
    }

    #[test]
    fn test_file_page_url_for_plain_asset() {
        let url = provider().file_page_url(
            "https://upload.wikimedia.org/wikipedia/commons/b/b8/Turdus-migratorius-002.jpg",
        );
        assert_eq!(
            url,
            "https://en.wikipedia.org/wiki/File:Turdus-migratorius-002.jpg"
        );
    }

    #[test]
    fn test_file_page_url_for_thumbnail_asset() {
        let url = provider().file_page_url(
            "https://upload.wikimedia.org/wikipedia/commons/thumb/b/b8/Turdus-migratorius-002.jpg/1024px-Turdus-migratorius-002.jpg",
        );
        assert_eq!(
            url,
            "https://en.wikipedia.org/wiki/File:Turdus-migratorius-002.jpg"
        );
    }

    #[test]
    fn test_thumbnail_url_substitution() {
        let url = thumbnail_url(
            "https://upload.wikimedia.org/wikipedia/commons/b/b8/Robin.jpg",
            "Robin.jpg",
        );
        assert_eq!(
            url,
            "https://upload.wikimedia.org/wikipedia/commons/thumb/b/b8/Robin.jpg/1024px-Robin.jpg"
        );
    }

    #[test]
    fn test_extract_author_href() {
        let provider = provider();
        assert_eq!(
            provider.extract_href(r#"<a href="https://example.com/u/jane">Jane</a>"#),
            Some("https://example.com/u/jane".to_string())
        );
        assert_eq!(provider.extract_href("plain text author"), None);
    }

    #[test]
    fn test_photo_page_url_uses_file_page() {
        let provider = provider();
        let record = ImageRecord {
            sci_name: "Turdus migratorius".to_string(),
            common_name: "American Robin".to_string(),
            image_url: "https://upload.wikimedia.org/wikipedia/commons/b/b8/Robin.jpg"
                .to_string(),
            title: "Turdus migratorius".to_string(),
            external_id: "Turdus migratorius".to_string(),
            author_url: String::new(),
            license_url: String::new(),
            created_at: chrono::NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
        };
        assert_eq!(
            provider.photo_page_url(&record),
            "https://en.wikipedia.org/wiki/File:Robin.jpg"
        );
    }
}
