//! Wire structures for the upstream photo APIs.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, de};

/// Deserializes a field the upstream encodes inconsistently as either a
/// JSON string or a number (the Flickr license id) into a `String`.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrNumberVisitor;

    impl de::Visitor<'_> for StringOrNumberVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a string or number")
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
            Ok(value.to_string())
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
            Ok(value.to_string())
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
            Ok(value.to_string())
        }
    }

    deserializer.deserialize_any(StringOrNumberVisitor)
}

/// Response of the photo search endpoint.
#[derive(Debug, Deserialize)]
pub struct FlickrSearchResponse {
    /// Result page, absent on upstream errors.
    pub photos: Option<FlickrPhotoPage>,
}

/// One page of photo search results.
#[derive(Debug, Deserialize)]
pub struct FlickrPhotoPage {
    /// Candidate photos, best match first.
    #[serde(default)]
    pub photo: Vec<FlickrPhoto>,
}

/// One photo search result.
#[derive(Debug, Clone, Deserialize)]
pub struct FlickrPhoto {
    /// Globally unique photo id.
    pub id: String,
    /// Uploader account id.
    pub owner: String,
    /// Secret fragment of the static asset URL.
    pub secret: String,
    /// Server fragment of the static asset URL.
    pub server: String,
    /// Farm fragment of the static asset URL.
    pub farm: u32,
    /// Caption, may be empty.
    #[serde(default)]
    pub title: String,
}

/// Response of the photo info endpoint.
#[derive(Debug, Deserialize)]
pub struct FlickrInfoResponse {
    /// Photo details, absent on upstream errors.
    pub photo: Option<FlickrPhotoInfo>,
}

/// Photo details carrying the numeric license code.
#[derive(Debug, Deserialize)]
pub struct FlickrPhotoInfo {
    /// License code, resolved through the license table.
    #[serde(deserialize_with = "string_or_number")]
    pub license: String,
}

/// Response of the license table endpoint.
#[derive(Debug, Deserialize)]
pub struct FlickrLicensesResponse {
    /// License table, absent on upstream errors.
    pub licenses: Option<FlickrLicenseList>,
}

/// The license table.
#[derive(Debug, Deserialize)]
pub struct FlickrLicenseList {
    /// Known licenses.
    #[serde(default)]
    pub license: Vec<FlickrLicense>,
}

/// One license table entry.
#[derive(Debug, Deserialize)]
pub struct FlickrLicense {
    /// License code as used by the info endpoint.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Link to the license terms, empty for "all rights reserved".
    #[serde(default)]
    pub url: String,
}

/// Response of the account lookup endpoint.
#[derive(Debug, Deserialize)]
pub struct FlickrFindUserResponse {
    /// Matched account, absent when the lookup failed.
    pub user: Option<FlickrUser>,
}

/// One matched account.
#[derive(Debug, Deserialize)]
pub struct FlickrUser {
    /// Stable external account id.
    pub nsid: String,
}

/// Response of the encyclopedia page summary endpoint.
#[derive(Debug, Deserialize)]
pub struct WikiSummaryResponse {
    /// Canonical page title.
    #[serde(default)]
    pub title: String,
    /// Lead image of the page, absent for pages without one.
    pub originalimage: Option<WikiOriginalImage>,
}

/// The page's lead image.
#[derive(Debug, Deserialize)]
pub struct WikiOriginalImage {
    /// Direct link to the full-size asset.
    pub source: String,
}

/// Response of the media metadata endpoint.
#[derive(Debug, Deserialize)]
pub struct WikiMetadataResponse {
    /// Query result, absent on upstream errors.
    pub query: Option<WikiQuery>,
}

/// Query result wrapper.
#[derive(Debug, Deserialize)]
pub struct WikiQuery {
    /// Matched file pages, keyed by page id.
    #[serde(default)]
    pub pages: HashMap<String, WikiPage>,
}

/// One matched file page.
#[derive(Debug, Deserialize)]
pub struct WikiPage {
    /// Image revisions, newest first.
    #[serde(default)]
    pub imageinfo: Vec<WikiImageInfo>,
}

/// Metadata of one image revision.
#[derive(Debug, Deserialize)]
pub struct WikiImageInfo {
    /// Pixel width of the original asset.
    #[serde(default)]
    pub width: u32,
    /// Extended attribution metadata.
    pub extmetadata: Option<WikiExtMetadata>,
}

/// Extended attribution metadata fields.
#[derive(Debug, Deserialize)]
pub struct WikiExtMetadata {
    /// Uploader attribution, an HTML fragment.
    #[serde(rename = "Artist")]
    pub artist: Option<WikiMetaValue>,
    /// Link to the license terms.
    #[serde(rename = "LicenseUrl")]
    pub license_url: Option<WikiMetaValue>,
}

/// A single metadata value.
#[derive(Debug, Deserialize)]
pub struct WikiMetaValue {
    /// The raw value.
    pub value: String,
}
