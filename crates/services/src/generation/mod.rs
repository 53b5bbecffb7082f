//! Card generation through an external text-generation service.

mod openai;
mod service;

use std::env;

use async_trait::async_trait;

use flashdeck_core::model::{BloomLevel, CardDraft, Deck, DeckFormat, Difficulty, InputKind};

use crate::error::GenerationError;

pub use openai::OpenAiCardGenerator;
pub use service::GenerationService;

/// Longest topic description accepted, in characters.
pub const MAX_TOPIC_CHARS: usize = 2_000;
/// Most cards a single request may ask for.
pub const MAX_QUESTION_COUNT: u32 = 50;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// What to generate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub topic: String,
    pub difficulty: Difficulty,
    pub question_count: u32,
    pub bloom_level: BloomLevel,
    pub format: DeckFormat,
    pub input_kind: InputKind,
}

impl GenerationRequest {
    #[must_use]
    pub fn new(topic: impl Into<String>, question_count: u32) -> Self {
        Self {
            topic: topic.into(),
            difficulty: Difficulty::default(),
            question_count,
            bloom_level: BloomLevel::default(),
            format: DeckFormat::default(),
            input_kind: InputKind::default(),
        }
    }

    /// Same settings as `deck`, asking for `question_count` cards.
    #[must_use]
    pub fn for_deck(deck: &Deck, question_count: u32) -> Self {
        Self {
            topic: deck.topic().to_owned(),
            difficulty: deck.difficulty(),
            question_count,
            bloom_level: deck.bloom_level(),
            format: deck.format(),
            input_kind: deck.input_kind(),
        }
    }

    /// # Errors
    ///
    /// Returns `GenerationError::EmptyTopic`, `GenerationError::TopicTooLong` or
    /// `GenerationError::InvalidCount` when the request is out of bounds.
    pub fn validate(&self) -> Result<(), GenerationError> {
        let topic = self.topic.trim();
        if topic.is_empty() {
            return Err(GenerationError::EmptyTopic);
        }
        let chars = topic.chars().count();
        if chars > MAX_TOPIC_CHARS {
            return Err(GenerationError::TopicTooLong(chars));
        }
        if !(1..=MAX_QUESTION_COUNT).contains(&self.question_count) {
            return Err(GenerationError::InvalidCount(self.question_count));
        }
        Ok(())
    }
}

/// Parsed result of one generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedCards {
    /// Topic label suggested by the service; may be blank.
    pub topic: String,
    pub difficulty: Option<Difficulty>,
    pub cards: Vec<CardDraft>,
}

/// Produces card text for a request.
#[async_trait]
pub trait CardGenerator: Send + Sync {
    /// # Errors
    ///
    /// Returns `GenerationError` when the service refuses or fails the request.
    async fn generate(&self, request: &GenerationRequest)
    -> Result<GeneratedCards, GenerationError>;
}

/// Connection settings for an OpenAI-compatible endpoint.
#[derive(Clone, Debug)]
pub struct GenerationConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl GenerationConfig {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.into(),
        }
    }

    /// Reads `FLASHDECK_AI_*` variables; `None` without an API key.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("FLASHDECK_AI_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url =
            env::var("FLASHDECK_AI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        let model = env::var("FLASHDECK_AI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());
        Some(Self {
            base_url,
            api_key,
            model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_blank_topic() {
        let err = GenerationRequest::new("   ", 5).validate().unwrap_err();
        assert!(matches!(err, GenerationError::EmptyTopic));
    }

    #[test]
    fn validate_rejects_long_topic() {
        let topic = "é".repeat(MAX_TOPIC_CHARS + 1);
        let err = GenerationRequest::new(topic, 5).validate().unwrap_err();
        assert!(matches!(err, GenerationError::TopicTooLong(n) if n == MAX_TOPIC_CHARS + 1));
    }

    #[test]
    fn validate_checks_count_bounds() {
        assert!(GenerationRequest::new("Rust", 1).validate().is_ok());
        assert!(GenerationRequest::new("Rust", MAX_QUESTION_COUNT).validate().is_ok());
        assert!(matches!(
            GenerationRequest::new("Rust", 0).validate(),
            Err(GenerationError::InvalidCount(0))
        ));
        assert!(matches!(
            GenerationRequest::new("Rust", 51).validate(),
            Err(GenerationError::InvalidCount(51))
        ));
    }

    #[test]
    fn topic_length_counts_characters() {
        let topic = "é".repeat(MAX_TOPIC_CHARS);
        assert!(GenerationRequest::new(topic, 3).validate().is_ok());
    }
}
