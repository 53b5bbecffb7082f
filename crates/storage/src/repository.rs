use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flashdeck_core::model::{
    BloomLevel, Card, Deck, DeckFormat, DeckId, Difficulty, InputKind,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Deck contents for an insert where storage allocates the id.
#[derive(Debug, Clone)]
pub struct NewDeckRecord {
    pub topic: String,
    pub difficulty: Difficulty,
    pub bloom_level: BloomLevel,
    pub format: DeckFormat,
    pub input_kind: InputKind,
    pub cards: Vec<Card>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewDeckRecord {
    /// Captures everything but the id of an already validated deck.
    #[must_use]
    pub fn from_deck(deck: &Deck) -> Self {
        Self {
            topic: deck.topic().to_owned(),
            difficulty: deck.difficulty(),
            bloom_level: deck.bloom_level(),
            format: deck.format(),
            input_kind: deck.input_kind(),
            cards: deck.cards().to_vec(),
            created_at: deck.created_at(),
            updated_at: deck.updated_at(),
        }
    }

    /// Attaches the allocated id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the record no longer forms a valid deck.
    pub fn into_deck(self, id: DeckId) -> Result<Deck, StorageError> {
        Deck::new(
            id,
            self.topic,
            self.difficulty,
            self.bloom_level,
            self.format,
            self.input_kind,
            self.cards,
            self.created_at,
            self.updated_at,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

/// Repository contract for decks and their cards (the deck store).
///
/// Cards are always read and written together with their deck.
#[async_trait]
pub trait DeckRepository: Send + Sync {
    /// Persist a new deck and return its allocated id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the deck cannot be stored.
    async fn insert_new_deck(&self, deck: NewDeckRecord) -> Result<DeckId, StorageError>;

    /// Persist or update a deck, replacing its card set.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the deck cannot be stored.
    async fn upsert_deck(&self, deck: &Deck) -> Result<(), StorageError>;

    /// Fetch a deck by ID, `None` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures or corrupt rows.
    async fn get_deck(&self, id: DeckId) -> Result<Option<Deck>, StorageError>;

    /// List decks ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures or corrupt rows.
    async fn list_decks(&self, limit: u32) -> Result<Vec<Deck>, StorageError>;

    /// Delete a deck together with its cards.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the deck does not exist.
    async fn delete_deck(&self, id: DeckId) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    decks: Arc<Mutex<HashMap<DeckId, Deck>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeckRepository for InMemoryRepository {
    async fn insert_new_deck(&self, deck: NewDeckRecord) -> Result<DeckId, StorageError> {
        let mut guard = self
            .decks
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let next = guard.keys().map(DeckId::value).max().unwrap_or(0) + 1;
        let id = DeckId::new(next);
        guard.insert(id, deck.into_deck(id)?);
        Ok(id)
    }

    async fn upsert_deck(&self, deck: &Deck) -> Result<(), StorageError> {
        let mut guard = self
            .decks
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(deck.id(), deck.clone());
        Ok(())
    }

    async fn get_deck(&self, id: DeckId) -> Result<Option<Deck>, StorageError> {
        let guard = self
            .decks
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&id).cloned())
    }

    async fn list_decks(&self, limit: u32) -> Result<Vec<Deck>, StorageError> {
        let guard = self
            .decks
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut decks: Vec<Deck> = guard.values().cloned().collect();
        decks.sort_by_key(Deck::id);
        decks.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(decks)
    }

    async fn delete_deck(&self, id: DeckId) -> Result<(), StorageError> {
        let mut guard = self
            .decks
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(&id).map(|_| ()).ok_or(StorageError::NotFound)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub decks: Arc<dyn DeckRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let decks: Arc<dyn DeckRepository> = Arc::new(InMemoryRepository::new());
        Self { decks }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashdeck_core::model::{CardDraft, DeckDraft};
    use flashdeck_core::time::fixed_now;

    fn record(topic: &str) -> NewDeckRecord {
        let deck = DeckDraft::new(topic)
            .with_cards(vec![
                CardDraft::new(1, "Q1", "A1"),
                CardDraft::new(2, "Q2", "A2"),
            ])
            .assign_id(DeckId::new(0), fixed_now())
            .unwrap();
        NewDeckRecord::from_deck(&deck)
    }

    #[tokio::test]
    async fn insert_allocates_sequential_ids() {
        let repo = InMemoryRepository::new();
        let first = repo.insert_new_deck(record("One")).await.unwrap();
        let second = repo.insert_new_deck(record("Two")).await.unwrap();
        assert_eq!(first, DeckId::new(1));
        assert_eq!(second, DeckId::new(2));

        let deck = repo.get_deck(second).await.unwrap().unwrap();
        assert_eq!(deck.id(), second);
        assert_eq!(deck.topic(), "Two");
        assert_eq!(deck.cards().len(), 2);
    }

    #[tokio::test]
    async fn missing_deck_is_none_and_delete_reports_not_found() {
        let repo = InMemoryRepository::new();
        assert!(repo.get_deck(DeckId::new(7)).await.unwrap().is_none());
        let err = repo.delete_deck(DeckId::new(7)).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn list_is_ordered_and_limited() {
        let repo = InMemoryRepository::new();
        for topic in ["A", "B", "C"] {
            repo.insert_new_deck(record(topic)).await.unwrap();
        }
        let decks = repo.list_decks(2).await.unwrap();
        let topics: Vec<&str> = decks.iter().map(Deck::topic).collect();
        assert_eq!(topics, vec!["A", "B"]);
    }
}
