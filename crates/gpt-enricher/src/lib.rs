//! Text-generation enrichment for anime metadata.
//!
//! Fills fields the other sources left empty by asking an OpenAI model for
//! a JSON object of replacement values, which is merged into the anime
//! document as-is.

pub mod openai;

pub use openai::{build_prompt, extract_update, OpenAiClient};
