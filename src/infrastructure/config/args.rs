use super::app_config::{LogLevel, ProviderKind};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "fieldfare",
    version,
    about = "Species illustrative-image cache for an acoustic detection station",
    long_about = None
)]
pub struct CliArgs {
    /// Scientific name to look up, e.g. "Turdus migratorius".
    pub sci_name: Option<String>,

    /// Blacklist an external photo id instead of looking up a species.
    #[arg(long, value_name = "ID")]
    pub blacklist: Option<String>,

    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Upstream image provider to bind.
    #[arg(long, value_enum)]
    pub provider: Option<ProviderKind>,

    /// Photo-sharing service API key.
    #[arg(long, env = "FLICKR_API_KEY", value_name = "KEY")]
    pub flickr_api_key: Option<String>,

    /// Curated account filter for the photo search.
    #[arg(long, value_name = "EMAIL")]
    pub flickr_filter: Option<String>,

    /// Image store database path.
    #[arg(long, value_name = "PATH")]
    pub store_path: Option<PathBuf>,

    /// Blacklist file path.
    #[arg(long, value_name = "PATH")]
    pub blacklist_path: Option<PathBuf>,

    /// Taxonomy labels file path.
    #[arg(long, value_name = "PATH")]
    pub labels_path: Option<PathBuf>,
}
