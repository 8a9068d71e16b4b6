//! Document models for the anime collection.
//!
//! Field names mirror what is stored in MongoDB (camelCase), so these types
//! round-trip through BSON without manual mapping. Documents written by
//! other tools may lack most fields, which is why everything defaults.

use crate::names::sanitize_filename;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Anime document as stored in the collection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Anime {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub title: String,
    pub status: String,
    pub synopsis: String,
    #[serde(rename = "type")]
    pub anime_type: String,
    pub format: String,
    pub episodes: i64,
    pub duration: i64,
    pub source: String,

    pub start_date: Option<FuzzyDate>,
    pub end_date: Option<FuzzyDate>,

    pub tags: Vec<String>,
    pub synonyms: Vec<String>,
    pub sources: Vec<String>,
    pub characters: Vec<Character>,
    pub streaming_episodes: Vec<StreamingEpisode>,
    pub studios: Vec<Studio>,

    pub path_image: String,
    pub average_score: i64,
    pub country_of_origin: String,
    pub is_adult: bool,

    // Provenance flags marking which external source last enriched the record
    pub chat_gpt: bool,
    pub chat_gpt_dont_found: bool,
    pub ani_list_api: bool,
    pub ani_list_not_found: bool,
}

/// Character embedded in its parent anime document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Character {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub name: String,
    pub path_image: String,
    pub link: String,
    pub bio: String,
    pub tags: Vec<String>,
    pub age: Option<String>,
    pub date_of_birth: Option<FuzzyDate>,
    pub voice_actors: Vec<VoiceActor>,
    pub ani_list_api: bool,
}

/// Voice actor credited for a character
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VoiceActor {
    pub name: String,
    pub language: String,
}

/// Streaming episode entry with its mirrored thumbnail path
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamingEpisode {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub site: String,
    pub title: String,
    pub path_image: String,
}

/// Production studio
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Studio {
    pub name: String,
}

/// Partial calendar date as used by AniList (any part may be missing)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct FuzzyDate {
    pub day: Option<i32>,
    pub month: Option<i32>,
    pub year: Option<i32>,
}

/// A queued image transfer: download from `url`, then upload as `path`.
///
/// Lives only for one run; nothing about it is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub url: String,
    pub path: String,
}

impl Upload {
    /// Queue `url` under a sanitized `<name>.jpg` destination
    pub fn for_name(url: impl Into<String>, name: &str) -> Self {
        Self {
            url: url.into(),
            path: format!("{}.jpg", sanitize_filename(name, "_")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_path_is_sanitized() {
        let upload = Upload::for_name("https://img.example/x.jpg", "Roronoa Zoro: Hunter");
        assert_eq!(upload.path, "Roronoa Zoro_ Hunter.jpg");
    }

    #[test]
    fn test_anime_defaults_from_sparse_document() {
        // Documents created by other tools carry only a few fields
        let doc = mongodb::bson::doc! { "title": "Naruto" };
        let anime: Anime = mongodb::bson::from_document(doc).unwrap();
        assert_eq!(anime.title, "Naruto");
        assert!(!anime.ani_list_api);
        assert!(!anime.chat_gpt);
        assert!(anime.characters.is_empty());
        assert!(anime.start_date.is_none());
    }

    #[test]
    fn test_character_bson_field_names() {
        let character = Character {
            id: Some(ObjectId::new()),
            name: "Sasuke Uchiha".to_string(),
            path_image: "Sasuke Uchiha.jpg".to_string(),
            ani_list_api: true,
            ..Default::default()
        };
        let doc = mongodb::bson::to_document(&character).unwrap();
        assert!(doc.contains_key("_id"));
        assert!(doc.contains_key("pathImage"));
        assert!(doc.contains_key("aniListApi"));
        assert!(doc.contains_key("dateOfBirth"));
    }
}
