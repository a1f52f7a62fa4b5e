//! Upstream photo source adapters.

mod dto;
mod flickr;
mod wikipedia;

pub use flickr::FlickrProvider;
pub use wikipedia::WikipediaProvider;

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::domain::errors::{CacheError, FetchError};
use crate::domain::ports::ImageProviderPort;
use crate::infrastructure::blacklist::Blacklist;
use crate::infrastructure::config::{AppConfig, HttpConfig, ProviderKind};
use crate::infrastructure::store::SqliteImageStore;
use crate::infrastructure::taxonomy::Taxonomy;

/// Builds the shared HTTP client used by every provider.
///
/// # Errors
/// Returns error if the client cannot be constructed.
pub fn build_http_client(config: &HttpConfig) -> Result<reqwest::Client, CacheError> {
    reqwest::Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| CacheError::http(format!("failed to create HTTP client: {e}")))
}

/// Constructs the provider the configuration binds the cache to.
///
/// # Errors
/// Returns error if the provider's binding check cannot reach the store.
pub async fn build_provider(
    config: &AppConfig,
    client: reqwest::Client,
    store: &SqliteImageStore,
    blacklist: Arc<Blacklist>,
    taxonomy: Arc<Taxonomy>,
) -> Result<Arc<dyn ImageProviderPort>, CacheError> {
    match config.provider {
        ProviderKind::Flickr => Ok(Arc::new(
            FlickrProvider::bind(&config.flickr, client, store, blacklist, taxonomy).await?,
        )),
        ProviderKind::Wikipedia => Ok(Arc::new(WikipediaProvider::new(client, taxonomy))),
    }
}

/// Issues a GET and decodes the JSON body.
///
/// Non-2xx statuses and undecodable bodies are fetch errors; the providers
/// map them to an absent result.
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
) -> Result<T, FetchError> {
    debug!(url, "Upstream GET");
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::network(format!("HTTP {status}")));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| FetchError::malformed(e.to_string()))
}

/// Percent-encodes spaces for hand-built query strings.
pub(crate) fn encode_spaces(text: &str) -> String {
    text.replace(' ', "%20")
}
