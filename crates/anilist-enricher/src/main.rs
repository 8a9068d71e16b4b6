//! AniList enrichment CLI application.

use anilist_enricher::{AniListClient, Enricher, ImageUploader};
use anyhow::{Context, Result};
use clap::Parser;
use shared::{AnimeStore, Config, Secrets, SnapshotWriter};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Process at most this many anime
    #[arg(short, long)]
    limit: Option<u32>,

    /// Skip image downloads and FTP uploads
    #[arg(long)]
    skip_uploads: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Initialize logging
    let log_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    shared::logging::init(shared::LogConfig {
        log_dir: config.log_dir().to_string_lossy().to_string(),
        component: "anilist-enricher".to_string(),
        default_level: log_level,
        console: true,
        file: true,
        json_format: false,
    })?;

    info!("AniList enricher starting");
    info!(config_file = %args.config.display(), "Loaded configuration");

    let secrets = Secrets::from_env().context("Failed to load secrets")?;

    // Connect to the database; an unreachable database is fatal
    let store = AnimeStore::connect(
        &secrets.db_uri,
        &config.database.name,
        &config.database.collection,
    )
    .await
    .context("Failed to connect to database")?;
    info!(
        database = %config.database.name,
        collection = %config.database.collection,
        "Database connection established"
    );

    // Set up the image uploader and probe the FTP server up front, so
    // credential problems surface before any database writes
    let uploader = if args.skip_uploads {
        warn!("Image uploads disabled for this run");
        None
    } else {
        let ftp = secrets.require_ftp()?;
        let uploader = ImageUploader::new(
            ftp.clone(),
            config.image_dir(),
            config.anilist.upload_delay_ms,
        )?;
        uploader.probe().await.context("FTP server check failed")?;
        info!(addr = %ftp.addr, "FTP server reachable");
        Some(uploader)
    };

    let client = AniListClient::new(
        config.anilist.base_url.clone(),
        config.anilist.per_page,
        config.anilist.max_pages,
        SnapshotWriter::new(config.snapshot_dir()),
    )
    .context("Failed to create AniList client")?;

    let mut enricher = Enricher::new(
        store,
        client,
        SnapshotWriter::new(config.snapshot_dir()),
        uploader,
        config.anilist.clone(),
    );

    info!("Starting enrichment process");
    let stats = enricher.run(args.limit).await.context("Enrichment failed")?;

    // Display final statistics
    info!("=== Enrichment Complete ===");
    info!("Anime processed: {}", stats.processed);
    info!("Skipped (short title): {}", stats.skipped_short_title);
    info!("Not found on AniList: {}", stats.not_found);
    info!("Characters updated: {}", stats.characters_updated);
    info!("Characters appended: {}", stats.characters_appended);
    info!("Uploads queued: {}", stats.uploads_queued);
    info!("Uploads sent: {}", stats.uploads_sent);
    info!("Errors: {}", stats.errors);

    info!("AniList enricher finished successfully");

    Ok(())
}
