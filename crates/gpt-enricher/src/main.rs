//! OpenAI enrichment CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use gpt_enricher::{build_prompt, extract_update, OpenAiClient};
use mongodb::bson::{self, doc};
use shared::store::ungenerated_filter;
use shared::{Anime, AnimeStore, Config, Secrets, SnapshotWriter};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

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
    #[arg(short, long, default_value_t = 1)]
    limit: u32,
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
        component: "gpt-enricher".to_string(),
        default_level: log_level,
        console: true,
        file: true,
        json_format: false,
    })?;

    info!("OpenAI enricher starting");
    info!(config_file = %args.config.display(), "Loaded configuration");

    let secrets = Secrets::from_env().context("Failed to load secrets")?;
    let api_key = secrets.require_openai_key()?.to_string();

    // Connect to the database; an unreachable database is fatal
    let store = AnimeStore::connect(
        &secrets.db_uri,
        &config.database.name,
        &config.database.collection,
    )
    .await
    .context("Failed to connect to database")?;

    let client = OpenAiClient::new(config.openai.base_url.clone(), api_key, config.openai.model.clone())
        .context("Failed to create OpenAI client")?;
    let snapshots = SnapshotWriter::new(config.snapshot_dir());

    let animes = store
        .list_page(1, args.limit, ungenerated_filter())
        .await
        .context("Failed to list anime awaiting generation")?;

    info!(count = animes.len(), "Anime awaiting generated metadata");

    let mut generated = 0usize;
    let mut failed = 0usize;

    for (idx, anime) in animes.iter().enumerate() {
        info!(
            progress = format!("{}/{}", idx + 1, animes.len()),
            title = %anime.title,
            "Processing anime"
        );

        match generate_one(&store, &client, &snapshots, anime).await {
            Ok(()) => generated += 1,
            Err(e) => {
                error!(title = %anime.title, error = %e, "Failed to generate metadata");
                failed += 1;
            }
        }

        sleep(Duration::from_millis(config.openai.request_delay_ms)).await;
    }

    // Display final statistics
    info!("=== Generation Complete ===");
    info!("Anime updated: {}", generated);
    info!("Errors: {}", failed);

    info!("OpenAI enricher finished successfully");

    Ok(())
}

/// Generate and merge metadata for one anime.
///
/// The raw API body is snapshotted before extraction. A reply the model
/// produced but that cannot be parsed marks the record as attempted so it
/// is not retried forever; transport failures leave the record untouched.
async fn generate_one(
    store: &AnimeStore,
    client: &OpenAiClient,
    snapshots: &SnapshotWriter,
    anime: &Anime,
) -> Result<()> {
    let id = anime.id.context("Anime document has no _id")?;

    let prompt = build_prompt(anime);
    let body = client.generate(&prompt).await?;

    snapshots.write_raw(&format!("CallOpenAI-{}", client.model()), &body)?;

    let update = match extract_update(&body) {
        Ok(update) => update,
        Err(e) => {
            warn!(title = %anime.title, error = %e, "Unusable model output, marking attempted");
            store
                .set_fields(&id, doc! { "chatGpt": true, "chatGptDontFound": true })
                .await?;
            return Ok(());
        }
    };

    let mut fields = bson::to_document(&update).context("Failed to convert model output")?;
    // The provenance flag is authoritative here, whatever the model said
    fields.insert("chatGpt", true);

    store
        .set_fields(&id, fields)
        .await
        .context("Failed to merge generated fields")?;

    info!(title = %anime.title, fields = update.len(), "Generated metadata merged");

    Ok(())
}
