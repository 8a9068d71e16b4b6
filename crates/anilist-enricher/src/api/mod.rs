//! AniList GraphQL client implementation.
//!
//! This module provides the paged character fetcher for the AniList
//! GraphQL API, including cross-page deduplication.

pub mod client;
pub mod types;

pub use client::{AniListClient, PageDecision, Paginator};
pub use types::*;
