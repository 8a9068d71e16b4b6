//! AniList GraphQL client with paged character fetching.
//!
//! The walk is a plain "fetch page, accumulate, stop when the service says
//! so" loop. Duplicate character ids across pages (a character listed under
//! several roles) are dropped, and a hard page cap bounds the loop against
//! a service that keeps reporting another page.

use super::types::{CharacterConnection, CharacterEdge, CharactersResponse, Media};
use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::json;
use shared::SnapshotWriter;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

const CHARACTERS_QUERY: &str = "\
query ($search: String!, $page: Int = 1, $perPage: Int = 50) {
  Media(search: $search, type: ANIME) {
    id
    title {
      romaji
      english
    }
    description
    countryOfOrigin
    isAdult
    episodes
    averageScore
    format
    status
    source
    duration
    startDate {
      year
      month
      day
    }
    endDate {
      year
      month
      day
    }
    streamingEpisodes {
      site
      title
      thumbnail
    }
    studios {
      nodes {
        name
      }
    }
    characters(page: $page, perPage: $perPage) {
      pageInfo {
        currentPage
        lastPage
        perPage
        hasNextPage
      }
      edges {
        role
        voiceActors {
          name {
            full
          }
          language
        }
        node {
          id
          name {
            full
            native
          }
          image {
            large
            medium
          }
          description
          siteUrl
          dateOfBirth {
            year
            month
            day
          }
          age
        }
      }
    }
  }
}";

/// AniList GraphQL client
pub struct AniListClient {
    /// HTTP client
    http: Client,
    /// GraphQL endpoint
    base_url: String,
    /// Character page size per query
    per_page: u32,
    /// Hard cap on pages fetched per media
    max_pages: u32,
    /// Raw response snapshots
    snapshots: SnapshotWriter,
}

impl AniListClient {
    /// Create a new AniList client
    pub fn new(
        base_url: String,
        per_page: u32,
        max_pages: u32,
        snapshots: SnapshotWriter,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("anime-enrich/0.1.0")
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url,
            per_page,
            max_pages,
            snapshots,
        })
    }

    /// Fetch one page of the character query
    async fn fetch_page(&self, search: &str, page: u32) -> Result<CharactersResponse> {
        let body = json!({
            "query": CHARACTERS_QUERY,
            "variables": {
                "search": search,
                "page": page,
                "perPage": self.per_page,
            },
        });

        debug!(search = search, page = page, "Querying AniList");

        let response = self
            .http
            .post(&self.base_url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .context("AniList request failed")?;

        // A not-found search still carries a JSON body (data.Media: null),
        // so the status code is not checked here.
        let bytes = response
            .bytes()
            .await
            .context("Failed to read AniList response body")?;

        self.snapshots.write_raw("aniList", &bytes)?;

        serde_json::from_slice(&bytes).context("Failed to decode AniList response")
    }

    /// Fetch the complete, deduplicated character edge list for the media
    /// best matching `search`, plus the full media metadata payload.
    ///
    /// Returns `None` when AniList has no media for the search. Any
    /// transport or decode failure aborts the whole fetch; no partial-page
    /// results are returned.
    pub async fn fetch_all_characters(
        &self,
        search: &str,
    ) -> Result<Option<(Vec<CharacterEdge>, Media)>> {
        let mut paginator = Paginator::new(self.max_pages);
        let mut payload: Option<Media> = None;

        loop {
            let response = self.fetch_page(search, paginator.page()).await?;

            let Some(media) = response.data.media else {
                if payload.is_none() {
                    info!(search = search, "AniList has no media for search");
                    return Ok(None);
                }
                // The media vanished mid-walk; keep what was accumulated.
                warn!(search = search, "Media disappeared between pages");
                break;
            };

            let decision = paginator.absorb(&media.characters);
            info!(
                search = search,
                page = media.characters.page_info.current_page,
                last_page = media.characters.page_info.last_page,
                "Fetched character page"
            );

            // The per-media metadata is identical on every page
            if payload.is_none() {
                payload = Some(media);
            }

            if decision == PageDecision::Done {
                break;
            }
        }

        let media = payload.context("Pagination ended without a media payload")?;
        Ok(Some((paginator.into_edges(), media)))
    }
}

/// Outcome of absorbing one page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDecision {
    /// Fetch the next page
    Continue,
    /// The walk is complete (or hit the page cap)
    Done,
}

/// Page accumulation state: deduplication by character id and the
/// termination rule, kept separate from the transport so both are testable
/// with synthetic page sequences.
#[derive(Debug)]
pub struct Paginator {
    seen: HashSet<i64>,
    edges: Vec<CharacterEdge>,
    page: u32,
    max_pages: u32,
}

impl Paginator {
    pub fn new(max_pages: u32) -> Self {
        Self {
            seen: HashSet::new(),
            edges: Vec::new(),
            page: 1,
            max_pages,
        }
    }

    /// The page to request next
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Accumulate one page of edges and decide whether to keep walking.
    ///
    /// An edge whose node id was already seen is dropped. The walk stops
    /// when the service reports no next page, when `currentPage` reaches
    /// `lastPage`, or unconditionally at the page cap.
    pub fn absorb(&mut self, characters: &CharacterConnection) -> PageDecision {
        for edge in &characters.edges {
            if self.seen.insert(edge.node.id) {
                self.edges.push(edge.clone());
            } else {
                debug!(character_id = edge.node.id, "Dropping duplicate character edge");
            }
        }

        let info = &characters.page_info;
        if !info.has_next_page || info.current_page >= info.last_page {
            return PageDecision::Done;
        }

        if self.page >= self.max_pages {
            warn!(
                max_pages = self.max_pages,
                "Page cap reached while the service still reports more pages"
            );
            return PageDecision::Done;
        }

        self.page += 1;
        PageDecision::Continue
    }

    /// The accumulated, deduplicated edge list
    pub fn into_edges(self) -> Vec<CharacterEdge> {
        self.edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{CharacterNode, PageInfo};

    fn edge(id: i64) -> CharacterEdge {
        CharacterEdge {
            node: CharacterNode {
                id,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn page(
        edges: Vec<CharacterEdge>,
        current_page: u32,
        last_page: u32,
        has_next_page: bool,
    ) -> CharacterConnection {
        CharacterConnection {
            page_info: PageInfo {
                current_page,
                last_page,
                per_page: 25,
                has_next_page,
            },
            edges,
        }
    }

    #[test]
    fn test_deduplicates_across_pages() {
        let mut paginator = Paginator::new(50);

        assert_eq!(
            paginator.absorb(&page(vec![edge(1), edge(2)], 1, 3, true)),
            PageDecision::Continue
        );
        // Page 2 repeats character 2 under another role
        assert_eq!(
            paginator.absorb(&page(vec![edge(2), edge(3)], 2, 3, true)),
            PageDecision::Continue
        );
        assert_eq!(
            paginator.absorb(&page(vec![edge(3), edge(4)], 3, 3, false)),
            PageDecision::Done
        );

        let ids: Vec<i64> = paginator.into_edges().iter().map(|e| e.node.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_stops_when_has_next_page_is_false() {
        let mut paginator = Paginator::new(50);
        assert_eq!(
            paginator.absorb(&page(vec![edge(1)], 1, 10, false)),
            PageDecision::Done
        );
    }

    #[test]
    fn test_stops_when_current_page_reaches_last_page() {
        let mut paginator = Paginator::new(50);
        assert_eq!(
            paginator.absorb(&page(vec![edge(1)], 1, 1, true)),
            PageDecision::Done
        );
    }

    #[test]
    fn test_page_cap_bounds_a_misbehaving_service() {
        // A service that always reports hasNextPage=true with a huge
        // lastPage must still terminate within max_pages.
        let mut paginator = Paginator::new(5);
        let mut pages_fetched = 0;

        loop {
            pages_fetched += 1;
            let current = paginator.page();
            let decision = paginator.absorb(&page(vec![edge(i64::from(current))], current, 9999, true));
            if decision == PageDecision::Done {
                break;
            }
        }

        assert_eq!(pages_fetched, 5);
    }

    #[test]
    fn test_page_advances_only_on_continue() {
        let mut paginator = Paginator::new(50);
        assert_eq!(paginator.page(), 1);
        paginator.absorb(&page(vec![edge(1)], 1, 2, true));
        assert_eq!(paginator.page(), 2);
    }
}
