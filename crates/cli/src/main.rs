//! rptrbook command line entry point.
//!
//! Results are written to stdout as JSON. Logging goes to stderr so output can be piped.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use rptrbook_client::{Fetcher, HttpTransport, LogProgress};
use rptrbook_core::{AppConfig, CacheStore, Column, Predicate, RepeaterDb, Status};

mod args;
mod error;

use args::{Cli, Command, NearArgs, SyncArgs};
use error::CliError;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = AppConfig::load()?;
    tracing::debug!(working_dir = %config.working_dir.display(), "configuration loaded");

    match cli.command {
        Command::Sync(args) => sync(&config, &args).await,
        Command::Near(args) => near(&config, &args).await,
        Command::Show { id } => show(&config, id).await,
        Command::PurgeCache => purge_cache(&config).await,
    }
}

fn init_tracing(json: bool) {
    let builder = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn sync(config: &AppConfig, args: &SyncArgs) -> Result<()> {
    config.require_app_email()?;

    let transport = HttpTransport::from_config(config)?;
    let cache = CacheStore::new(config.cache_dir());
    let fetcher = Fetcher::new(Arc::new(transport), cache, config)?.with_progress(Arc::new(LogProgress));
    let db = RepeaterDb::open(config.database_path()).await?;

    let stats = fetcher.sync(&args.to_query(), &db).await?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

async fn near(config: &AppConfig, args: &NearArgs) -> Result<()> {
    let db = RepeaterDb::open(config.database_path()).await?;

    let mut filters = Vec::new();
    if !args.bands.is_empty() {
        filters.push(Predicate::bands(&args.bands));
    }
    if args.on_air {
        filters.push(Predicate::eq(Column::OperationalStatus, Status::OnAir));
    }

    let repeaters = db.near(&args.radius(), &filters).await?;
    tracing::info!(found = repeaters.len(), "radius search complete");
    println!("{}", serde_json::to_string_pretty(&repeaters)?);
    Ok(())
}

async fn show(config: &AppConfig, id: i64) -> Result<()> {
    let db = RepeaterDb::open(config.database_path()).await?;
    let repeater = db.get(id).await?.ok_or(CliError::NotFound(id))?;
    println!("{}", serde_json::to_string_pretty(&repeater)?);
    Ok(())
}

async fn purge_cache(config: &AppConfig) -> Result<()> {
    let cache = CacheStore::new(config.cache_dir());
    let removed = cache.purge_stale(config.max_cache_age()).await?;
    tracing::info!(removed, dir = %cache.dir().display(), "cache purged");
    println!("{}", serde_json::json!({ "removed": removed }));
    Ok(())
}
