//! Server entry point for the catalog export service.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use catalog_export::{AppState, Database, Pipeline, PipelineConfig, SqliteBulkLoader, serve};
use tracing::{debug, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; values then come from flags or the environment.
    let _ = dotenvy::dotenv();

    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");
    info!("Catalog export starting");

    let config = PipelineConfig::new(&args.catalog_origin)?
        .with_export_anchor_id(&args.export_anchor_id)?
        .with_directories(&args.staging_dir, &args.archive_dir)
        .with_fetch_settings(args.fetch_settings());
    config.ensure_directories().await?;
    info!(
        staging = %config.staging_dir().display(),
        archive = %config.archive_dir().display(),
        "directories ready"
    );

    let db = Database::new(&args.database)
        .await
        .with_context(|| format!("opening database {}", args.database.display()))?;
    let loader = Arc::new(SqliteBulkLoader::new(db.clone()));
    let pipeline = Arc::new(Pipeline::new(config, loader));

    serve(args.bind, AppState::new(pipeline))
        .await
        .with_context(|| format!("serving on {}", args.bind))?;

    db.close().await;
    info!("Catalog export stopped");
    Ok(())
}
