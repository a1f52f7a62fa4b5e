//! Infrastructure layer with external service adapters.

/// Durable image blacklist.
pub mod blacklist;
/// Application configuration.
pub mod config;
/// Upstream photo source adapters.
pub mod providers;
/// Persistent image store.
pub mod store;
/// Local taxonomy table.
pub mod taxonomy;

pub use blacklist::Blacklist;
pub use config::{AppConfig, CliArgs, FlickrConfig, LogLevel, ProviderKind, StorageManager};
pub use providers::{FlickrProvider, WikipediaProvider, build_http_client, build_provider};
pub use store::SqliteImageStore;
pub use taxonomy::Taxonomy;
