use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, eyre};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use fieldfare::application::{SessionMemo, SpeciesImageService};
use fieldfare::infrastructure::config::AppConfig;
use fieldfare::infrastructure::{
    Blacklist, CliArgs, SqliteImageStore, StorageManager, Taxonomy, build_http_client,
    build_provider,
};

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = config.effective_log_path() {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry().with(filter).init();
    }

    Ok(())
}

async fn run(args: CliArgs) -> Result<()> {
    let storage = StorageManager::new()?;
    let mut config = storage.load_config(args.config.as_deref())?;
    config.merge_with_args(&args);

    init_logging(&config)?;
    info!(version = fieldfare::VERSION, "Starting fieldfare");

    let store_path = config
        .effective_store_path()
        .ok_or_else(|| eyre!("could not determine image store path"))?;
    let store = Arc::new(SqliteImageStore::open(&store_path)?);

    let blacklist_path = config
        .effective_blacklist_path()
        .ok_or_else(|| eyre!("could not determine blacklist path"))?;
    let blacklist = Arc::new(Blacklist::load(blacklist_path)?);

    let labels_path = config
        .effective_labels_path()
        .ok_or_else(|| eyre!("could not determine taxonomy labels path"))?;
    let taxonomy = Arc::new(Taxonomy::load(&labels_path)?);

    let client = build_http_client(&config.http)?;
    let provider =
        build_provider(&config, client, &store, blacklist.clone(), taxonomy.clone()).await?;
    let service = SpeciesImageService::new(store, provider, blacklist, taxonomy);

    if let Some(external_id) = args.blacklist {
        service.blacklist_image(&external_id)?;
        println!("blacklisted image id {external_id}");
        return Ok(());
    }

    let sci_name = args.sci_name.ok_or_else(|| {
        eyre!("a scientific name is required, e.g. fieldfare \"Turdus migratorius\"")
    })?;

    let mut memo = SessionMemo::default();
    match service.get_image(&mut memo, &sci_name).await? {
        Some(record) => {
            let mut value = serde_json::to_value(&record)?;
            value["photo_page_url"] =
                serde_json::Value::String(service.photo_page_url(&record));
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        None => println!("no image available for {sci_name}"),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = CliArgs::parse();
    run(args).await
}
