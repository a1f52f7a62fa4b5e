//! Application configuration.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const APP_QUALIFIER: &str = "org";
const APP_ORGANIZATION: &str = "fieldfare";
const APP_NAME: &str = "fieldfare";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Which upstream image source the cache is bound to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Photo-sharing service, optionally scoped to a curated account.
    Flickr,
    /// Encyclopedia media repository, needs no API key.
    #[default]
    Wikipedia,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Flickr => write!(f, "flickr"),
            Self::Wikipedia => write!(f, "wikipedia"),
        }
    }
}

/// Application configuration.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration file path.
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[serde(skip)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Bound upstream provider.
    #[serde(default)]
    pub provider: ProviderKind,

    /// Photo-sharing service settings.
    #[serde(default)]
    pub flickr: FlickrConfig,

    /// Outbound HTTP settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Durable file locations.
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Photo-sharing service settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlickrConfig {
    /// API key for the photo-sharing service.
    #[serde(default)]
    pub api_key: String,

    /// Optional curated-account filter; unset searches run unscoped across
    /// the public corpus.
    #[serde(default)]
    pub filter_email: Option<String>,
}

/// Outbound HTTP settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds. There are no automatic retries; the
    /// next render cycle is the retry.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent header sent to the upstream services.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// Durable file locations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Image store database path.
    #[serde(default)]
    pub store: Option<PathBuf>,

    /// Blacklist file path.
    #[serde(default)]
    pub blacklist: Option<PathBuf>,

    /// Taxonomy labels file path.
    #[serde(default)]
    pub labels: Option<PathBuf>,
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_user_agent() -> String {
    format!("fieldfare/{}", env!("CARGO_PKG_VERSION"))
}

use super::args::CliArgs;

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(config_path) = &args.config {
            self.config = Some(config_path.clone());
        }
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(provider) = args.provider {
            self.provider = provider;
        }
        if let Some(api_key) = &args.flickr_api_key {
            self.flickr.api_key = api_key.clone();
        }
        if let Some(filter) = &args.flickr_filter {
            self.flickr.filter_email = Some(filter.clone());
        }
        if let Some(store_path) = &args.store_path {
            self.paths.store = Some(store_path.clone());
        }
        if let Some(blacklist_path) = &args.blacklist_path {
            self.paths.blacklist = Some(blacklist_path.clone());
        }
        if let Some(labels_path) = &args.labels_path {
            self.paths.labels = Some(labels_path.clone());
        }
    }

    /// Returns default data directory.
    #[must_use]
    pub fn default_data_dir() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.data_dir().to_path_buf())
    }

    /// Returns default log file path.
    #[must_use]
    pub fn default_log_path() -> Option<PathBuf> {
        Self::default_data_dir().map(|dir| dir.join("fieldfare.log"))
    }

    /// Returns effective log path.
    #[must_use]
    pub fn effective_log_path(&self) -> Option<PathBuf> {
        self.log_path.clone().or_else(Self::default_log_path)
    }

    /// Returns effective image store path.
    #[must_use]
    pub fn effective_store_path(&self) -> Option<PathBuf> {
        self.paths
            .store
            .clone()
            .or_else(|| Self::default_data_dir().map(|dir| dir.join("images.db")))
    }

    /// Returns effective blacklist path.
    #[must_use]
    pub fn effective_blacklist_path(&self) -> Option<PathBuf> {
        self.paths
            .blacklist
            .clone()
            .or_else(|| Self::default_data_dir().map(|dir| dir.join("blacklisted_images.txt")))
    }

    /// Returns effective taxonomy labels path.
    #[must_use]
    pub fn effective_labels_path(&self) -> Option<PathBuf> {
        self.paths
            .labels
            .clone()
            .or_else(|| Self::default_data_dir().map(|dir| dir.join("labels.json")))
    }
}
