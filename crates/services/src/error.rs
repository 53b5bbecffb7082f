//! Shared error types for the services crate.

use thiserror::Error;

use flashdeck_core::model::{DeckError, DeckId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `DeckService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DeckServiceError {
    #[error("deck {0} not found")]
    NotFound(DeckId),
    #[error(transparent)]
    Deck(#[from] DeckError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while starting a study session.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StudyError {
    #[error("deck {0} not found")]
    DeckNotFound(DeckId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by card generation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GenerationError {
    #[error("card generation is not configured")]
    Disabled,
    #[error("topic must not be empty")]
    EmptyTopic,
    #[error("topic is {0} characters, at most {max} allowed", max = crate::generation::MAX_TOPIC_CHARS)]
    TopicTooLong(usize),
    #[error("question count must be between 1 and {max}, got {0}", max = crate::generation::MAX_QUESTION_COUNT)]
    InvalidCount(u32),
    #[error("rate limit exceeded, try again later")]
    RateLimited,
    #[error("content flagged as inappropriate: {}", .0.join(", "))]
    Flagged(Vec<String>),
    #[error("generation request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("generation returned no cards")]
    EmptyResponse,
    #[error("generation response could not be parsed: {0}")]
    Malformed(String),
    #[error("card {0} not found")]
    CardNotFound(flashdeck_core::model::CardId),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Deck(#[from] DeckServiceError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
