//! Name-match reconciliation of incoming AniList characters against the
//! characters already embedded in an anime document.
//!
//! The match rule is a coarse first-word, case-insensitive comparison; two
//! characters sharing a first name will collide, which is accepted here.
//! Reconciliation is a pure planning step: it decides, per edge, whether to
//! update an existing record in place or append a new one, and which image
//! transfers to queue. Applying the plan against the store is the
//! orchestrator's job.

use crate::api::types::CharacterEdge;
use anyhow::{Context, Result};
use mongodb::bson::{self, doc, oid::ObjectId, Document};
use shared::names::{compare_first_words, sanitize_filename};
use shared::{Character, Upload, VoiceActor};

/// One decided action for one incoming character edge
#[derive(Debug, Clone)]
pub enum CharacterAction {
    /// Merge the edge's fields into the stored character matched by name.
    /// `image` is set only when the stored record had no image path yet.
    Update {
        name: String,
        edge: CharacterEdge,
        image: Option<Upload>,
    },
    /// Append a brand-new embedded character. `upload` is absent only when
    /// the edge carries no image URL.
    Append {
        character: Character,
        upload: Option<Upload>,
    },
}

/// The full reconciliation plan for one anime
#[derive(Debug, Clone, Default)]
pub struct ReconcilePlan {
    pub actions: Vec<CharacterAction>,
}

impl ReconcilePlan {
    /// All image transfers the plan queues
    pub fn uploads(&self) -> Vec<Upload> {
        self.actions
            .iter()
            .filter_map(|action| match action {
                CharacterAction::Update { image, .. } => image.clone(),
                CharacterAction::Append { upload, .. } => upload.clone(),
            })
            .collect()
    }

    pub fn updated(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| matches!(a, CharacterAction::Update { .. }))
            .count()
    }

    pub fn appended(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| matches!(a, CharacterAction::Append { .. }))
            .count()
    }
}

/// Decide, for every incoming edge, whether it updates an existing stored
/// character or appends a new one. Each edge yields exactly one action.
pub fn reconcile(existing: &[Character], edges: &[CharacterEdge]) -> ReconcilePlan {
    let mut actions = Vec::with_capacity(edges.len());

    for edge in edges {
        let incoming = edge.node.name.full.as_str();

        let matched = existing
            .iter()
            .find(|character| compare_first_words(&character.name, incoming));

        match matched {
            Some(character) => {
                let image = if character.path_image.is_empty() {
                    edge.node
                        .image
                        .large
                        .clone()
                        .map(|url| Upload::for_name(url, incoming))
                } else {
                    None
                };

                actions.push(CharacterAction::Update {
                    name: character.name.clone(),
                    edge: edge.clone(),
                    image,
                });
            }
            None => {
                let upload = edge.node.image.large.clone().map(|url| Upload::for_name(url, incoming));

                actions.push(CharacterAction::Append {
                    character: new_character(edge),
                    upload,
                });
            }
        }
    }

    ReconcilePlan { actions }
}

/// Build a new embedded character from an edge
pub fn new_character(edge: &CharacterEdge) -> Character {
    let name = edge.node.name.full.clone();

    Character {
        id: Some(ObjectId::new()),
        path_image: format!("{}.jpg", sanitize_filename(&name, "_")),
        name,
        link: edge.node.site_url.clone().unwrap_or_default(),
        bio: edge.node.description.clone().unwrap_or_default(),
        age: edge.node.age.clone(),
        date_of_birth: edge.node.date_of_birth.clone(),
        voice_actors: voice_actors(edge),
        ani_list_api: true,
        ..Default::default()
    }
}

/// Positional `$set` document merging an edge's fields into the matched
/// embedded character
pub fn character_patch(edge: &CharacterEdge) -> Result<Document> {
    Ok(doc! {
        "characters.$.bio": edge.node.description.clone().unwrap_or_default(),
        "characters.$.link": edge.node.site_url.clone().unwrap_or_default(),
        "characters.$.age": edge.node.age.clone().unwrap_or_default(),
        "characters.$.dateOfBirth": bson::to_bson(&edge.node.date_of_birth)
            .context("Failed to serialize date of birth")?,
        "characters.$.voiceActors": bson::to_bson(&voice_actors(edge))
            .context("Failed to serialize voice actors")?,
        "characters.$.aniListApi": true,
    })
}

fn voice_actors(edge: &CharacterEdge) -> Vec<VoiceActor> {
    edge.voice_actors
        .iter()
        .map(|actor| VoiceActor {
            name: actor.name.full.clone(),
            language: actor.language.clone().unwrap_or_default(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{CharacterImage, CharacterName, CharacterNode};

    fn edge(id: i64, name: &str, image: Option<&str>) -> CharacterEdge {
        CharacterEdge {
            node: CharacterNode {
                id,
                name: CharacterName {
                    full: name.to_string(),
                    native: None,
                },
                image: CharacterImage {
                    large: image.map(str::to_string),
                    medium: None,
                },
                description: Some(format!("{} bio", name)),
                site_url: Some(format!("https://anilist.co/character/{}", id)),
                age: Some("17".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn stored(name: &str, path_image: &str) -> Character {
        Character {
            name: name.to_string(),
            path_image: path_image.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_anime_appends_everything() {
        // One anime with zero stored characters and three unique edges:
        // three appends, three uploads, zero in-place updates.
        let edges = vec![
            edge(1, "Naruto Uzumaki", Some("https://img.example/1.jpg")),
            edge(2, "Sasuke Uchiha", Some("https://img.example/2.jpg")),
            edge(3, "Sakura Haruno", Some("https://img.example/3.jpg")),
        ];

        let plan = reconcile(&[], &edges);

        assert_eq!(plan.appended(), 3);
        assert_eq!(plan.updated(), 0);
        assert_eq!(plan.uploads().len(), 3);
    }

    #[test]
    fn test_matched_character_updates_in_place() {
        // Stored "Sasuke Uchiha" with no image path, incoming "Sasuke":
        // one in-place update, one queued upload, no new record.
        let existing = vec![stored("Sasuke Uchiha", "")];
        let edges = vec![edge(2, "Sasuke", Some("https://img.example/sasuke.jpg"))];

        let plan = reconcile(&existing, &edges);

        assert_eq!(plan.updated(), 1);
        assert_eq!(plan.appended(), 0);

        let uploads = plan.uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].path, "Sasuke.jpg");

        match &plan.actions[0] {
            CharacterAction::Update { name, image, .. } => {
                assert_eq!(name, "Sasuke Uchiha");
                assert!(image.is_some());
            }
            other => panic!("expected update, got {:?}", other),
        }
    }

    #[test]
    fn test_matched_character_with_image_queues_nothing() {
        let existing = vec![stored("Sasuke Uchiha", "Sasuke Uchiha.jpg")];
        let edges = vec![edge(2, "Sasuke", Some("https://img.example/sasuke.jpg"))];

        let plan = reconcile(&existing, &edges);

        assert_eq!(plan.updated(), 1);
        assert!(plan.uploads().is_empty());
    }

    #[test]
    fn test_each_edge_yields_exactly_one_action() {
        let existing = vec![stored("Naruto Uzumaki", "naruto.jpg")];
        let edges = vec![
            edge(1, "Naruto", Some("https://img.example/1.jpg")),
            edge(4, "Kakashi Hatake", Some("https://img.example/4.jpg")),
        ];

        let plan = reconcile(&existing, &edges);

        assert_eq!(plan.actions.len(), edges.len());
        assert_eq!(plan.updated(), 1);
        assert_eq!(plan.appended(), 1);
    }

    #[test]
    fn test_new_character_fields() {
        let character = new_character(&edge(7, "Gaara: of the Sand", Some("https://img.example/7.jpg")));

        assert!(character.id.is_some());
        assert_eq!(character.name, "Gaara: of the Sand");
        assert_eq!(character.path_image, "Gaara_ of the Sand.jpg");
        assert_eq!(character.bio, "Gaara: of the Sand bio");
        assert!(character.ani_list_api);
    }

    #[test]
    fn test_character_patch_uses_positional_paths() {
        let patch = character_patch(&edge(2, "Sasuke", None)).unwrap();

        assert_eq!(patch.get_str("characters.$.bio").unwrap(), "Sasuke bio");
        assert_eq!(patch.get_str("characters.$.age").unwrap(), "17");
        assert!(patch.get_bool("characters.$.aniListApi").unwrap());
        assert!(patch.contains_key("characters.$.voiceActors"));
    }
}
