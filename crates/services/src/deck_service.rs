use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use flashdeck_core::model::{CardDraft, CardId, Deck, DeckDraft, DeckError, DeckId, MoveDirection};
use storage::repository::{DeckRepository, NewDeckRecord, StorageError};

use crate::Clock;
use crate::error::DeckServiceError;

/// Upper bound on decks read for overview listings.
const OVERVIEW_LIMIT: u32 = 1_000;

/// Decks sharing one topic, most recently updated first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicGroup {
    pub topic: String,
    pub decks: Vec<Deck>,
}

/// Orchestrates deck creation, editing and persistence.
#[derive(Clone)]
pub struct DeckService {
    clock: Clock,
    decks: Arc<dyn DeckRepository>,
}

impl DeckService {
    #[must_use]
    pub fn new(clock: Clock, decks: Arc<dyn DeckRepository>) -> Self {
        Self { clock, decks }
    }

    /// Validate a draft and persist it as a new deck.
    ///
    /// # Errors
    ///
    /// Returns `DeckServiceError::Deck` for validation failures.
    /// Returns `DeckServiceError::Storage` if persistence fails.
    pub async fn create_deck(&self, draft: DeckDraft) -> Result<Deck, DeckServiceError> {
        let now = self.clock.now();
        let deck = draft.assign_id(DeckId::new(0), now)?;
        let record = NewDeckRecord::from_deck(&deck);
        let deck_id = self.decks.insert_new_deck(record.clone()).await?;
        info!(deck_id = %deck_id, cards = deck.cards().len(), "deck created");
        Ok(record.into_deck(deck_id)?)
    }

    /// List decks ordered by ID, up to the given limit.
    ///
    /// # Errors
    ///
    /// Returns `DeckServiceError::Storage` if repository access fails.
    pub async fn list_decks(&self, limit: u32) -> Result<Vec<Deck>, DeckServiceError> {
        let decks = self.decks.list_decks(limit).await?;
        Ok(decks)
    }

    /// Fetch a deck by ID.
    ///
    /// Returns `Ok(None)` when the deck does not exist.
    ///
    /// # Errors
    ///
    /// Returns `DeckServiceError::Storage` if repository access fails.
    pub async fn get_deck(&self, deck_id: DeckId) -> Result<Option<Deck>, DeckServiceError> {
        let deck = self.decks.get_deck(deck_id).await?;
        Ok(deck)
    }

    /// Fetch a deck that must exist.
    ///
    /// # Errors
    ///
    /// Returns `DeckServiceError::NotFound` when the deck does not exist.
    /// Returns `DeckServiceError::Storage` if repository access fails.
    pub async fn require_deck(&self, deck_id: DeckId) -> Result<Deck, DeckServiceError> {
        self.get_deck(deck_id)
            .await?
            .ok_or(DeckServiceError::NotFound(deck_id))
    }

    /// Delete a deck and its cards.
    ///
    /// # Errors
    ///
    /// Returns `DeckServiceError::NotFound` when the deck does not exist.
    /// Returns `DeckServiceError::Storage` if repository access fails.
    pub async fn delete_deck(&self, deck_id: DeckId) -> Result<(), DeckServiceError> {
        match self.decks.delete_deck(deck_id).await {
            Ok(()) => {
                info!(deck_id = %deck_id, "deck deleted");
                Ok(())
            }
            Err(StorageError::NotFound) => Err(DeckServiceError::NotFound(deck_id)),
            Err(err) => Err(err.into()),
        }
    }

    /// The deck touched last, if any.
    ///
    /// # Errors
    ///
    /// Returns `DeckServiceError::Storage` if repository access fails.
    pub async fn most_recent_deck(&self) -> Result<Option<Deck>, DeckServiceError> {
        let decks = self.decks.list_decks(OVERVIEW_LIMIT).await?;
        Ok(decks.into_iter().max_by_key(Deck::updated_at))
    }

    /// Decks grouped by topic, groups sorted by topic name and decks inside
    /// each group by `updated_at`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `DeckServiceError::Storage` if repository access fails.
    pub async fn decks_by_topic(&self) -> Result<Vec<TopicGroup>, DeckServiceError> {
        let decks = self.decks.list_decks(OVERVIEW_LIMIT).await?;
        Ok(group_by_topic(decks))
    }

    //
    // ─── CARD EDITS ────────────────────────────────────────────────────────────
    //

    /// Replace the question and answer of one card.
    ///
    /// # Errors
    ///
    /// Returns `DeckServiceError::NotFound` for a missing deck,
    /// `DeckServiceError::Deck` for an unknown card, or
    /// `DeckServiceError::Storage` if persistence fails.
    pub async fn update_card(
        &self,
        deck_id: DeckId,
        card_id: CardId,
        question: String,
        answer: String,
    ) -> Result<Deck, DeckServiceError> {
        self.edit(deck_id, |deck, now| {
            deck.update_card(card_id, question, answer, now)
        })
        .await
        .map(|((), deck)| deck)
    }

    /// Append an empty card at the end of the deck.
    ///
    /// # Errors
    ///
    /// Returns `DeckServiceError::NotFound` for a missing deck, or
    /// `DeckServiceError::Storage` if persistence fails.
    pub async fn add_blank_card(&self, deck_id: DeckId) -> Result<CardId, DeckServiceError> {
        self.edit(deck_id, |deck, now| Ok(deck.add_blank_card(now)))
            .await
            .map(|(card_id, _)| card_id)
    }

    /// Remove a card; the remaining cards are renumbered.
    ///
    /// # Errors
    ///
    /// Returns `DeckServiceError::NotFound` for a missing deck,
    /// `DeckServiceError::Deck` for an unknown card, or
    /// `DeckServiceError::Storage` if persistence fails.
    pub async fn remove_card(
        &self,
        deck_id: DeckId,
        card_id: CardId,
    ) -> Result<Deck, DeckServiceError> {
        self.edit(deck_id, |deck, now| deck.remove_card(card_id, now).map(|_| ()))
            .await
            .map(|((), deck)| deck)
    }

    /// Swap a card with its neighbour. Returns `false` when nothing moved.
    ///
    /// # Errors
    ///
    /// Returns `DeckServiceError::NotFound` for a missing deck, or
    /// `DeckServiceError::Storage` if persistence fails.
    pub async fn move_card(
        &self,
        deck_id: DeckId,
        card_id: CardId,
        direction: MoveDirection,
    ) -> Result<bool, DeckServiceError> {
        let mut deck = self.require_deck(deck_id).await?;
        if !deck.move_card(card_id, direction, self.clock.now()) {
            return Ok(false);
        }
        self.decks.upsert_deck(&deck).await?;
        Ok(true)
    }

    /// Replace every card of the deck.
    ///
    /// # Errors
    ///
    /// Returns `DeckServiceError::NotFound` for a missing deck, or
    /// `DeckServiceError::Storage` if persistence fails.
    pub async fn replace_cards(
        &self,
        deck_id: DeckId,
        cards: Vec<CardDraft>,
    ) -> Result<Deck, DeckServiceError> {
        self.edit(deck_id, |deck, now| {
            deck.replace_cards(cards, now);
            Ok(())
        })
        .await
        .map(|((), deck)| deck)
    }

    async fn edit<T>(
        &self,
        deck_id: DeckId,
        apply: impl FnOnce(&mut Deck, chrono::DateTime<chrono::Utc>) -> Result<T, DeckError>,
    ) -> Result<(T, Deck), DeckServiceError> {
        let mut deck = self.require_deck(deck_id).await?;
        let out = apply(&mut deck, self.clock.now())?;
        self.decks.upsert_deck(&deck).await?;
        Ok((out, deck))
    }
}

fn group_by_topic(decks: Vec<Deck>) -> Vec<TopicGroup> {
    let mut groups: BTreeMap<String, Vec<Deck>> = BTreeMap::new();
    for deck in decks {
        groups.entry(deck.topic().to_owned()).or_default().push(deck);
    }
    groups
        .into_iter()
        .map(|(topic, mut decks)| {
            decks.sort_by(|a, b| b.updated_at().cmp(&a.updated_at()));
            TopicGroup { topic, decks }
        })
        .collect()
}
