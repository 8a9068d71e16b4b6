//! The enrichment orchestration loop.
//!
//! Two-phase, strictly sequential pipeline: walk every anime record that
//! AniList has not yet enriched, merge the fetched metadata and characters
//! into the collection, and queue image transfers which are flushed through
//! the uploader every `upload_batch` anime and once at the end.
//!
//! Error policy: startup failures (configuration, database connection) are
//! fatal and handled in main; everything per-record, per-character and
//! per-upload is logged, counted and skipped.

use crate::api::types::{CharacterEdge, Media};
use crate::api::AniListClient;
use crate::reconcile::{self, CharacterAction};
use crate::uploader::ImageUploader;
use anyhow::{Context, Result};
use mongodb::bson::{self, doc, oid::ObjectId, Document};
use serde_json::json;
use shared::config::AniListConfig;
use shared::names::sanitize_filename;
use shared::store::unenriched_filter;
use shared::{Anime, AnimeStore, SnapshotWriter, StreamingEpisode, Upload};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Statistics for one enrichment run
#[derive(Debug, Clone, Default)]
pub struct EnricherStats {
    pub processed: usize,
    pub skipped_short_title: usize,
    pub not_found: usize,
    pub characters_updated: usize,
    pub characters_appended: usize,
    pub uploads_queued: usize,
    pub uploads_sent: usize,
    pub errors: usize,
}

/// Drives the paginator, the reconciler and the uploader end to end
pub struct Enricher {
    store: AnimeStore,
    client: AniListClient,
    snapshots: SnapshotWriter,
    /// None when uploads are disabled for the run
    uploader: Option<ImageUploader>,
    config: AniListConfig,
}

impl Enricher {
    pub fn new(
        store: AnimeStore,
        client: AniListClient,
        snapshots: SnapshotWriter,
        uploader: Option<ImageUploader>,
        config: AniListConfig,
    ) -> Self {
        Self {
            store,
            client,
            snapshots,
            uploader,
            config,
        }
    }

    /// Run the complete enrichment pass over all unenriched anime
    pub async fn run(&mut self, limit: Option<u32>) -> Result<EnricherStats> {
        let list_limit = limit.unwrap_or(self.config.list_limit);

        let animes = self
            .store
            .list_page(1, list_limit, unenriched_filter())
            .await
            .context("Failed to list unenriched anime")?;

        info!(count = animes.len(), "Anime awaiting AniList enrichment");

        let mut stats = EnricherStats::default();

        for (idx, anime) in animes.iter().enumerate() {
            info!(
                progress = format!("{}/{}", idx + 1, animes.len()),
                title = %anime.title,
                "Processing anime"
            );

            match self.enrich_one(anime, &mut stats).await {
                Ok(()) => stats.processed += 1,
                Err(e) => {
                    error!(title = %anime.title, error = %e, "Failed to enrich anime");
                    stats.errors += 1;
                }
            }

            if self.config.upload_batch > 0 && (idx + 1) % self.config.upload_batch == 0 {
                self.flush_uploads(&mut stats).await;
            }
        }

        // Whatever the batching left behind
        self.flush_uploads(&mut stats).await;

        Ok(stats)
    }

    /// Enrich one anime record: fetch, merge metadata, reconcile characters
    async fn enrich_one(&mut self, anime: &Anime, stats: &mut EnricherStats) -> Result<()> {
        let id = anime.id.context("Anime document has no _id")?;

        // Very short titles produce junk search matches
        if anime.title.chars().count() < self.config.min_title_len {
            self.mark_not_found(&id).await?;
            stats.skipped_short_title += 1;
            info!(title = %anime.title, "Title too short for search, marked not found");
            return Ok(());
        }

        // Fixed inter-call delay, the only concession to AniList rate limits
        sleep(Duration::from_millis(self.config.request_delay_ms)).await;

        let Some((edges, media)) = self.client.fetch_all_characters(&anime.title).await? else {
            self.mark_not_found(&id).await?;
            stats.not_found += 1;
            return Ok(());
        };

        let description_empty = media.description.as_deref().unwrap_or("").is_empty();
        if edges.is_empty() && description_empty {
            self.mark_not_found(&id).await?;
            stats.not_found += 1;
            info!(title = %anime.title, "AniList match carries no usable data");
            return Ok(());
        }

        let episodes = self.collect_streaming_episodes(&media, stats);

        self.snapshots.write_value(
            &sanitize_filename(&anime.title, "_"),
            &json!({ "media": &media, "edges": &edges }),
        )?;

        self.store
            .set_fields(&id, media_patch(&media, &episodes)?)
            .await
            .context("Failed to merge media metadata")?;

        self.apply_plan(&id, &anime.characters, &edges, stats).await;

        Ok(())
    }

    /// Convert streaming episodes into embedded documents and queue their
    /// thumbnails
    fn collect_streaming_episodes(
        &mut self,
        media: &Media,
        stats: &mut EnricherStats,
    ) -> Vec<StreamingEpisode> {
        let mut episodes = Vec::with_capacity(media.streaming_episodes.len());

        for episode in &media.streaming_episodes {
            let title = episode.title.clone().unwrap_or_default();
            let path = format!("{}.jpg", sanitize_filename(&title, "_"));

            if let Some(thumbnail) = &episode.thumbnail {
                self.queue_upload(
                    Upload {
                        url: thumbnail.clone(),
                        path: path.clone(),
                    },
                    stats,
                );
            }

            episodes.push(StreamingEpisode {
                id: Some(ObjectId::new()),
                site: episode.site.clone().unwrap_or_default(),
                title,
                path_image: path,
            });
        }

        episodes
    }

    /// Reconcile and apply every character edge; per-character failures are
    /// logged and the remaining edges still get applied
    async fn apply_plan(
        &mut self,
        id: &ObjectId,
        existing: &[shared::Character],
        edges: &[CharacterEdge],
        stats: &mut EnricherStats,
    ) {
        let plan = reconcile::reconcile(existing, edges);

        for action in plan.actions {
            match self.apply_action(id, action, stats).await {
                Ok(()) => {}
                Err(e) => {
                    warn!(error = %e, "Failed to apply character action, skipping");
                    stats.errors += 1;
                }
            }
        }
    }

    async fn apply_action(
        &mut self,
        id: &ObjectId,
        action: CharacterAction,
        stats: &mut EnricherStats,
    ) -> Result<()> {
        match action {
            CharacterAction::Update { name, edge, image } => {
                self.store
                    .update_matched_character(&name, reconcile::character_patch(&edge)?)
                    .await?;

                if let Some(upload) = image {
                    self.store
                        .update_matched_character(
                            &name,
                            doc! { "characters.$.pathImage": upload.path.clone() },
                        )
                        .await?;
                    self.queue_upload(upload, stats);
                }

                stats.characters_updated += 1;
            }
            CharacterAction::Append { character, upload } => {
                self.store.push_character(id, &character).await?;

                if let Some(upload) = upload {
                    self.queue_upload(upload, stats);
                }

                stats.characters_appended += 1;
            }
        }

        Ok(())
    }

    fn queue_upload(&mut self, upload: Upload, stats: &mut EnricherStats) {
        stats.uploads_queued += 1;
        if let Some(uploader) = &mut self.uploader {
            uploader.enqueue(upload);
        }
    }

    async fn flush_uploads(&mut self, stats: &mut EnricherStats) {
        if let Some(uploader) = &mut self.uploader {
            stats.uploads_sent += uploader.flush().await;
        }
    }

    async fn mark_not_found(&self, id: &ObjectId) -> Result<()> {
        self.store
            .set_fields(id, doc! { "aniListNotFound": true, "aniListApi": true })
            .await
            .context("Failed to mark anime not found")?;
        Ok(())
    }
}

/// `$set` document merging the media metadata into the anime document
pub fn media_patch(media: &Media, episodes: &[StreamingEpisode]) -> Result<Document> {
    let studios = media
        .studios
        .as_ref()
        .map(|s| s.nodes.clone())
        .unwrap_or_default();

    Ok(doc! {
        "synopsis": media.description.clone().unwrap_or_default(),
        "countryOfOrigin": media.country_of_origin.clone().unwrap_or_default(),
        "isAdult": media.is_adult.unwrap_or(false),
        "episodes": media.episodes.unwrap_or(0),
        "averageScore": media.average_score.unwrap_or(0),
        "type": media.format.clone().unwrap_or_default(),
        "format": media.format.clone().unwrap_or_default(),
        "startDate": bson::to_bson(&media.start_date).context("Failed to serialize start date")?,
        "endDate": bson::to_bson(&media.end_date).context("Failed to serialize end date")?,
        "status": media.status.clone().unwrap_or_default(),
        "source": media.source.clone().unwrap_or_default(),
        "duration": media.duration.unwrap_or(0),
        "streamingEpisodes": bson::to_bson(&episodes).context("Failed to serialize episodes")?,
        "studios": bson::to_bson(&studios).context("Failed to serialize studios")?,
        "aniListApi": true,
    })
}
