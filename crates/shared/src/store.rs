//! MongoDB access for the anime collection.
//!
//! One explicitly constructed [`AnimeStore`] is passed into every component
//! at startup; there is no ambient global client. Only the handful of
//! operations the pipeline needs are exposed: paged aggregation listing,
//! field-level `$set` updates, positional character updates, appends and
//! counts.

use crate::models::{Anime, Character};
use anyhow::{Context, Result};
use mongodb::{
    bson::{self, doc, oid::ObjectId, Document},
    options::ClientOptions,
    Client, Collection,
};
use tracing::{debug, info};

/// Handle to the anime collection
#[derive(Debug, Clone)]
pub struct AnimeStore {
    collection: Collection<Document>,
}

impl AnimeStore {
    /// Connect to MongoDB and ping it.
    ///
    /// A failure here is fatal at startup; nothing else retries the
    /// connection.
    pub async fn connect(uri: &str, database: &str, collection: &str) -> Result<Self> {
        let options = ClientOptions::parse(uri)
            .await
            .context("Failed to parse MongoDB URI")?;

        let client = Client::with_options(options).context("Failed to create MongoDB client")?;

        let db = client.database(database);
        db.run_command(doc! { "ping": 1 }, None)
            .await
            .context("Failed to ping MongoDB")?;

        info!(database = database, collection = collection, "Connected to MongoDB");

        Ok(Self {
            collection: db.collection(collection),
        })
    }

    /// List one page of anime matching `filter`, in listing order.
    ///
    /// Runs a `$match` / `$skip` / `$limit` aggregation; `page` is 1-based.
    pub async fn list_page(&self, page: u32, page_size: u32, filter: Document) -> Result<Vec<Anime>> {
        let skip = i64::from(page.saturating_sub(1)) * i64::from(page_size);

        let pipeline = vec![
            doc! { "$match": filter },
            doc! { "$skip": skip },
            doc! { "$limit": i64::from(page_size) },
        ];

        let mut cursor = self
            .collection
            .aggregate(pipeline, None)
            .await
            .context("Anime aggregation failed")?;

        let mut animes = Vec::new();
        while cursor.advance().await.context("Anime cursor failed")? {
            let document = cursor
                .deserialize_current()
                .context("Failed to read anime document")?;
            let anime: Anime =
                bson::from_document(document).context("Failed to decode anime document")?;
            animes.push(anime);
        }

        debug!(page = page, count = animes.len(), "Listed anime page");

        Ok(animes)
    }

    /// `$set` the given fields on one anime by id
    pub async fn set_fields(&self, id: &ObjectId, fields: Document) -> Result<u64> {
        let result = self
            .collection
            .update_one(doc! { "_id": id }, doc! { "$set": fields }, None)
            .await
            .context("Failed to update anime fields")?;

        Ok(result.modified_count)
    }

    /// `$set` positional (`characters.$.*`) fields on the first embedded
    /// character whose name matches `name` case-insensitively
    pub async fn update_matched_character(&self, name: &str, fields: Document) -> Result<u64> {
        let result = self
            .collection
            .update_one(character_name_filter(name), doc! { "$set": fields }, None)
            .await
            .context("Failed to update matched character")?;

        Ok(result.modified_count)
    }

    /// Append a new embedded character to one anime
    pub async fn push_character(&self, id: &ObjectId, character: &Character) -> Result<()> {
        let character =
            bson::to_bson(character).context("Failed to serialize character")?;

        self.collection
            .update_one(
                doc! { "_id": id },
                doc! { "$push": { "characters": character } },
                None,
            )
            .await
            .context("Failed to append character")?;

        Ok(())
    }

    /// Count documents matching `filter`
    pub async fn count(&self, filter: Document) -> Result<u64> {
        self.collection
            .count_documents(filter, None)
            .await
            .context("Failed to count documents")
    }
}

/// Anime not yet enriched from AniList
pub fn unenriched_filter() -> Document {
    doc! { "aniListApi": { "$ne": true } }
}

/// Anime not yet enriched by the text-generation pass
pub fn ungenerated_filter() -> Document {
    doc! { "chatGpt": { "$ne": true } }
}

/// Case-insensitive filter on an embedded character name.
///
/// The name is regex-escaped; stored names like "Monkey D. Luffy (young)"
/// must match literally.
pub fn character_name_filter(name: &str) -> Document {
    doc! {
        "characters.name": {
            "$regex": regex::escape(name),
            "$options": "i",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unenriched_filter_shape() {
        let filter = unenriched_filter();
        let inner = filter.get_document("aniListApi").unwrap();
        assert_eq!(inner.get_bool("$ne").unwrap(), true);
    }

    #[test]
    fn test_character_name_filter_escapes_regex() {
        let filter = character_name_filter("Monkey D. Luffy (young)");
        let inner = filter.get_document("characters.name").unwrap();
        let pattern = inner.get_str("$regex").unwrap();
        assert!(pattern.contains(r"\("));
        assert!(pattern.contains(r"\."));
        assert_eq!(inner.get_str("$options").unwrap(), "i");
    }
}
