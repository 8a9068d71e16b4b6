//! AniList enrichment pipeline.
//!
//! Walks the anime collection for records not yet enriched from AniList,
//! fetches each media's full character list through the paged GraphQL API,
//! reconciles the characters against what is already stored, and mirrors
//! downloaded images to a remote server over passive-mode FTP.

pub mod api;
pub mod enricher;
pub mod ftp;
pub mod reconcile;
pub mod uploader;

pub use api::AniListClient;
pub use enricher::{Enricher, EnricherStats};
pub use ftp::FtpClient;
pub use reconcile::{reconcile, CharacterAction, ReconcilePlan};
pub use uploader::ImageUploader;
