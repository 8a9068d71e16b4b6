//! Batched image mirroring: download each queued image, push it over one
//! shared FTP session, and delete the local staging copy.
//!
//! The queue is owned by this type and lives only for one run. Per-upload
//! failures are logged and skipped; if the FTP session itself cannot be
//! established the queue is kept for the next flush.

use crate::ftp::FtpClient;
use anyhow::{Context, Result};
use reqwest::Client;
use shared::{FtpSecrets, Upload};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Download-then-FTP-upload worker with a batched queue
pub struct ImageUploader {
    /// HTTP client for image downloads
    http: Client,
    /// FTP endpoint and credentials
    ftp: FtpSecrets,
    /// Local staging directory for downloaded images
    image_dir: PathBuf,
    /// Fixed delay between uploads
    upload_delay: Duration,
    /// Pending transfers
    queue: Vec<Upload>,
}

impl ImageUploader {
    pub fn new(ftp: FtpSecrets, image_dir: PathBuf, upload_delay_ms: u64) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("anime-enrich/0.1.0")
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            ftp,
            image_dir,
            upload_delay: Duration::from_millis(upload_delay_ms),
            queue: Vec::new(),
        })
    }

    /// Verify that the FTP server accepts our login.
    ///
    /// Called once at startup so credential problems surface before any
    /// database writes happen.
    pub async fn probe(&self) -> Result<()> {
        let client = FtpClient::connect(&self.ftp.addr, &self.ftp.user, &self.ftp.password)
            .await
            .context("FTP login probe failed")?;
        client.close().await.ok();
        Ok(())
    }

    /// Queue one transfer
    pub fn enqueue(&mut self, upload: Upload) {
        debug!(url = %upload.url, path = %upload.path, "Queued image upload");
        self.queue.push(upload);
    }

    /// Number of pending transfers
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Drain the queue through one FTP session.
    ///
    /// Returns the number of images actually uploaded. Never fails the run:
    /// individual transfer errors are logged and the item is dropped, while
    /// a session-establishment failure keeps the whole queue for the next
    /// flush.
    pub async fn flush(&mut self) -> usize {
        if self.queue.is_empty() {
            return 0;
        }

        info!(pending = self.queue.len(), "Flushing image upload queue");

        let mut ftp = match FtpClient::connect(&self.ftp.addr, &self.ftp.user, &self.ftp.password)
            .await
        {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "FTP session failed, keeping queue for next flush");
                return 0;
            }
        };

        let pending = std::mem::take(&mut self.queue);
        let mut uploaded = 0;

        for upload in pending {
            if upload.url.is_empty() {
                warn!(path = %upload.path, "Skipping upload with no source URL");
                continue;
            }

            match self.transfer(&mut ftp, &upload).await {
                Ok(()) => {
                    uploaded += 1;
                    info!(path = %upload.path, "Image uploaded");
                }
                Err(e) => {
                    warn!(path = %upload.path, error = %e, "Image upload failed, skipping");
                }
            }

            sleep(self.upload_delay).await;
        }

        if let Err(e) = ftp.close().await {
            debug!(error = %e, "FTP close failed");
        }

        uploaded
    }

    /// Download one image to the staging directory, upload it, and remove
    /// the staging copy
    async fn transfer(&self, ftp: &mut FtpClient, upload: &Upload) -> Result<()> {
        tokio::fs::create_dir_all(&self.image_dir)
            .await
            .with_context(|| format!("Failed to create image directory: {}", self.image_dir.display()))?;

        let local = self.image_dir.join(&upload.path);

        let bytes = self
            .http
            .get(&upload.url)
            .send()
            .await
            .context("Image download failed")?
            .error_for_status()
            .context("Image download failed")?
            .bytes()
            .await
            .context("Failed to read image body")?;

        tokio::fs::write(&local, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", local.display()))?;

        debug!(path = %local.display(), bytes = bytes.len(), "Image downloaded");

        ftp.upload_file(&local).await?;

        // The local copy is only a staging file
        if let Err(e) = tokio::fs::remove_file(&local).await {
            warn!(path = %local.display(), error = %e, "Failed to remove staging file");
        }

        Ok(())
    }
}
