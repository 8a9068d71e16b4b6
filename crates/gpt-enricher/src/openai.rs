//! OpenAI responses-API client and the prompt/reply plumbing around it.
//!
//! The model is asked for a bare JSON object whose keys are anime document
//! fields; the reply text is unfenced, parsed and handed back as the update
//! map. Anything that is not a JSON object is an error, the caller decides
//! what to do with a record the model could not describe.

use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use shared::Anime;
use std::fmt::Write as _;
use std::time::Duration;
use tracing::debug;

/// OpenAI responses-API client
pub struct OpenAiClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(base_url: String, api_key: String, model: String) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(120))
            .user_agent("anime-enrich/0.1.0")
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url,
            api_key,
            model,
        })
    }

    /// The model this client generates with
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one generation request and return the raw response body.
    ///
    /// The body is returned unparsed so the caller can snapshot it before
    /// extraction.
    pub async fn generate(&self, input: &str) -> Result<Vec<u8>> {
        let body = json!({
            "model": self.model,
            "input": input,
        });

        debug!(model = %self.model, input_len = input.len(), "Calling OpenAI");

        let response = self
            .http
            .post(format!("{}/v1/responses", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("OpenAI request failed")?
            .error_for_status()
            .context("OpenAI request rejected")?;

        let bytes = response
            .bytes()
            .await
            .context("Failed to read OpenAI response body")?;

        Ok(bytes.to_vec())
    }
}

#[derive(Debug, Deserialize)]
struct ResponsesReply {
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(default)]
    content: Vec<ContentItem>,
}

#[derive(Debug, Deserialize)]
struct ContentItem {
    #[serde(default)]
    text: String,
}

/// Pull the generated JSON object out of a raw responses-API body.
///
/// The model text is taken from the first content item of the first output
/// item; a markdown code fence around it is tolerated and stripped.
pub fn extract_update(body: &[u8]) -> Result<Map<String, Value>> {
    let reply: ResponsesReply =
        serde_json::from_slice(body).context("Failed to decode OpenAI response")?;

    let text = reply
        .output
        .first()
        .and_then(|item| item.content.first())
        .map(|content| content.text.as_str())
        .context("OpenAI response has no output text")?;

    let stripped = strip_code_fence(text);

    let value: Value = serde_json::from_str(stripped)
        .context("Model output is not valid JSON")?;

    match value {
        Value::Object(map) => Ok(map),
        other => bail!("Model output is not a JSON object: {}", other),
    }
}

/// Strip an optional ```json fence from the model output
fn strip_code_fence(text: &str) -> &str {
    let text = text.trim().trim_matches('`');
    text.strip_prefix("json").unwrap_or(text).trim()
}

/// Build the generation prompt for one anime.
///
/// Lists the fields currently on the record and the embedded character
/// names, and asks for a JSON object containing only corrected or filled-in
/// fields plus the provenance flag.
pub fn build_prompt(anime: &Anime) -> String {
    let mut prompt = String::new();

    let _ = writeln!(
        prompt,
        "You are completing the metadata of an anime in a catalog database."
    );
    let _ = writeln!(prompt, "Current record:");
    let _ = writeln!(prompt, "  title: {}", anime.title);
    let _ = writeln!(prompt, "  synopsis: {}", anime.synopsis);
    let _ = writeln!(prompt, "  status: {}", anime.status);
    let _ = writeln!(prompt, "  episodes: {}", anime.episodes);

    if !anime.characters.is_empty() {
        let _ = writeln!(prompt, "  characters:");
        for character in &anime.characters {
            let _ = writeln!(prompt, "    - {}", character.name);
        }
    }

    let _ = writeln!(prompt);
    let _ = writeln!(
        prompt,
        "Reply with a single JSON object and nothing else. Use only these \
         keys, and only when you can fill or improve the value: \"synopsis\", \
         \"status\", \"episodes\", \"tags\", \"synonyms\", \"characters\". \
         If you include \"characters\", it must be the complete array of \
         objects with \"name\", \"bio\" and \"age\" keys."
    );
    let _ = writeln!(
        prompt,
        "If you recognize the anime, include \"chatGpt\": true. If you do \
         not recognize it, reply with exactly {{\"chatGpt\": true, \
         \"chatGptDontFound\": true}}."
    );

    prompt
}
