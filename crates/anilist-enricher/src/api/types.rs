//! AniList GraphQL response types.
//!
//! One canonical schema for the character-enrichment query. AniList returns
//! `data.Media: null` (with an errors array we do not inspect) when no media
//! matches the search, so the media payload is optional.

use serde::{Deserialize, Serialize};
use shared::FuzzyDate;

/// Top-level GraphQL response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharactersResponse {
    pub data: ResponseData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseData {
    #[serde(rename = "Media")]
    pub media: Option<Media>,
}

/// Media metadata plus one page of its character edges
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Media {
    pub id: i64,
    pub title: MediaTitle,
    pub description: Option<String>,
    pub country_of_origin: Option<String>,
    pub is_adult: Option<bool>,
    pub episodes: Option<i64>,
    pub average_score: Option<i64>,
    pub format: Option<String>,
    pub status: Option<String>,
    pub source: Option<String>,
    pub duration: Option<i64>,
    pub start_date: Option<FuzzyDate>,
    pub end_date: Option<FuzzyDate>,
    pub streaming_episodes: Vec<StreamingEpisodeNode>,
    pub studios: Option<StudioConnection>,
    pub characters: CharacterConnection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaTitle {
    pub romaji: Option<String>,
    pub english: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamingEpisodeNode {
    pub site: Option<String>,
    pub title: Option<String>,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudioConnection {
    pub nodes: Vec<StudioNode>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudioNode {
    pub name: String,
}

/// Paginated character edge list
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CharacterConnection {
    pub page_info: PageInfo,
    pub edges: Vec<CharacterEdge>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageInfo {
    pub current_page: u32,
    pub last_page: u32,
    pub per_page: u32,
    pub has_next_page: bool,
}

/// One character edge: role, voice actors and the character node itself
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CharacterEdge {
    pub role: Option<String>,
    pub voice_actors: Vec<VoiceActorNode>,
    pub node: CharacterNode,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CharacterNode {
    pub id: i64,
    pub name: CharacterName,
    pub image: CharacterImage,
    pub description: Option<String>,
    pub site_url: Option<String>,
    pub date_of_birth: Option<FuzzyDate>,
    pub age: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CharacterName {
    pub full: String,
    pub native: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CharacterImage {
    pub large: Option<String>,
    pub medium: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VoiceActorNode {
    pub name: StaffName,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaffName {
    pub full: String,
}
