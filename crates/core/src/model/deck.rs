use std::collections::HashSet;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::card::{Card, CardDraft};
use crate::model::ids::{CardId, DeckId};
use crate::model::kinds::{BloomLevel, DeckFormat, Difficulty, InputKind};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DeckError {
    #[error("deck topic cannot be empty")]
    EmptyTopic,

    #[error("card order {0} is used more than once")]
    DuplicateOrder(i64),

    #[error("card id {0} is used more than once")]
    DuplicateCardId(CardId),

    #[error("card {0} does not belong to this deck")]
    UnknownCard(CardId),
}

/// Direction for reordering a card within its deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// A deck that has not been given an id yet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeckDraft {
    pub topic: String,
    pub difficulty: Difficulty,
    pub bloom_level: BloomLevel,
    pub format: DeckFormat,
    pub input_kind: InputKind,
    pub cards: Vec<CardDraft>,
}

impl DeckDraft {
    #[must_use]
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: DeckFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_cards(mut self, cards: Vec<CardDraft>) -> Self {
        self.cards = cards;
        self
    }

    /// Turns the draft into a stored deck.
    ///
    /// Cards are sorted by their draft `order`, then numbered `1..=n` for both
    /// id and order.
    ///
    /// # Errors
    ///
    /// Returns `DeckError::EmptyTopic` if the topic is blank.
    pub fn assign_id(self, id: DeckId, now: DateTime<Utc>) -> Result<Deck, DeckError> {
        let topic = normalize_topic(&self.topic)?;
        Ok(Deck {
            id,
            topic,
            difficulty: self.difficulty,
            bloom_level: self.bloom_level,
            format: self.format,
            input_kind: self.input_kind,
            cards: number_drafts(self.cards, 1),
            created_at: now,
            updated_at: now,
        })
    }
}

fn normalize_topic(topic: &str) -> Result<String, DeckError> {
    let trimmed = topic.trim();
    if trimmed.is_empty() {
        return Err(DeckError::EmptyTopic);
    }
    Ok(trimmed.to_owned())
}

fn number_drafts(mut drafts: Vec<CardDraft>, first_id: u64) -> Vec<Card> {
    drafts.sort_by_key(|d| d.order);
    drafts
        .into_iter()
        .zip(0_u64..)
        .map(|(draft, offset)| {
            let position = offset + 1;
            draft.assign_id(
                CardId::new(first_id + offset),
                i64::try_from(position).unwrap_or(i64::MAX),
            )
        })
        .collect()
}

//
// ─── DECK ──────────────────────────────────────────────────────────────────────
//

/// A named collection of flashcards sharing difficulty, level and format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    id: DeckId,
    topic: String,
    difficulty: Difficulty,
    bloom_level: BloomLevel,
    format: DeckFormat,
    input_kind: InputKind,
    cards: Vec<Card>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Deck {
    /// Rebuilds a deck from persisted parts.
    ///
    /// # Errors
    ///
    /// Returns `DeckError::EmptyTopic` for a blank topic, and
    /// `DuplicateOrder`/`DuplicateCardId` when the cards are not uniquely keyed.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: DeckId,
        topic: impl Into<String>,
        difficulty: Difficulty,
        bloom_level: BloomLevel,
        format: DeckFormat,
        input_kind: InputKind,
        cards: Vec<Card>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, DeckError> {
        let topic = normalize_topic(&topic.into())?;

        let mut orders = HashSet::with_capacity(cards.len());
        let mut ids = HashSet::with_capacity(cards.len());
        for card in &cards {
            if !orders.insert(card.order()) {
                return Err(DeckError::DuplicateOrder(card.order()));
            }
            if !ids.insert(card.id()) {
                return Err(DeckError::DuplicateCardId(card.id()));
            }
        }

        Ok(Self {
            id,
            topic,
            difficulty,
            bloom_level,
            format,
            input_kind,
            cards,
            created_at,
            updated_at,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> DeckId {
        self.id
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn bloom_level(&self) -> BloomLevel {
        self.bloom_level
    }

    #[must_use]
    pub fn format(&self) -> DeckFormat {
        self.format
    }

    #[must_use]
    pub fn input_kind(&self) -> InputKind {
        self.input_kind
    }

    /// Cards in storage order; see [`Deck::sorted_cards`] for study order.
    #[must_use]
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    #[must_use]
    pub fn card(&self, id: CardId) -> Option<&Card> {
        self.cards.iter().find(|c| c.id() == id)
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// The canonical card sequence, ascending by `order`.
    #[must_use]
    pub fn sorted_cards(&self) -> Vec<Card> {
        let mut cards = self.cards.clone();
        cards.sort_by_key(Card::order);
        cards
    }

    /// Replaces the text of one card.
    ///
    /// # Errors
    ///
    /// Returns `DeckError::UnknownCard` if the card is not in this deck.
    pub fn update_card(
        &mut self,
        id: CardId,
        question: impl Into<String>,
        answer: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), DeckError> {
        let card = self
            .cards
            .iter_mut()
            .find(|c| c.id() == id)
            .ok_or(DeckError::UnknownCard(id))?;
        card.set_text(question.into(), answer.into());
        self.updated_at = now;
        Ok(())
    }

    /// Appends an empty card after the current last one and returns its id.
    pub fn add_blank_card(&mut self, now: DateTime<Utc>) -> CardId {
        let id = CardId::new(self.next_card_id());
        let order = self.cards.iter().map(Card::order).max().unwrap_or(0) + 1;
        self.cards.push(Card::new(id, order, "", ""));
        self.updated_at = now;
        id
    }

    /// Removes a card and renumbers the rest `1..=n` in sequence.
    ///
    /// # Errors
    ///
    /// Returns `DeckError::UnknownCard` if the card is not in this deck.
    pub fn remove_card(&mut self, id: CardId, now: DateTime<Utc>) -> Result<Card, DeckError> {
        let index = self
            .cards
            .iter()
            .position(|c| c.id() == id)
            .ok_or(DeckError::UnknownCard(id))?;
        let removed = self.cards.remove(index);
        self.renumber();
        self.updated_at = now;
        Ok(removed)
    }

    /// Swaps a card's order with its neighbour in the sorted sequence.
    ///
    /// Returns `false` (and leaves the deck untouched) for unknown ids or when
    /// the card is already at that end.
    pub fn move_card(&mut self, id: CardId, direction: MoveDirection, now: DateTime<Utc>) -> bool {
        self.cards.sort_by_key(Card::order);
        let Some(index) = self.cards.iter().position(|c| c.id() == id) else {
            return false;
        };
        let neighbour = match direction {
            MoveDirection::Up => index.checked_sub(1),
            MoveDirection::Down => Some(index + 1).filter(|i| *i < self.cards.len()),
        };
        let Some(neighbour) = neighbour else {
            return false;
        };

        let order = self.cards[index].order();
        let other = self.cards[neighbour].order();
        self.cards[index].set_order(other);
        self.cards[neighbour].set_order(order);
        self.cards.swap(index, neighbour);
        self.updated_at = now;
        true
    }

    /// Replaces every card, as when the whole deck is regenerated.
    pub fn replace_cards(&mut self, drafts: Vec<CardDraft>, now: DateTime<Utc>) {
        let first_id = self.next_card_id();
        self.cards = number_drafts(drafts, first_id);
        self.updated_at = now;
    }

    fn next_card_id(&self) -> u64 {
        self.cards.iter().map(|c| c.id().value()).max().unwrap_or(0) + 1
    }

    fn renumber(&mut self) {
        self.cards.sort_by_key(Card::order);
        for (card, order) in self.cards.iter_mut().zip(1_i64..) {
            card.set_order(order);
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn build_deck() -> Deck {
        DeckDraft::new("  Capitals  ")
            .with_cards(vec![
                CardDraft::new(30, "Spain?", "Madrid"),
                CardDraft::new(10, "France?", "Paris"),
                CardDraft::new(20, "Italy?", "Rome"),
            ])
            .assign_id(DeckId::new(1), fixed_now())
            .unwrap()
    }

    fn questions(deck: &Deck) -> Vec<&str> {
        let mut cards: Vec<&Card> = deck.cards().iter().collect();
        cards.sort_by_key(|c| c.order());
        cards.into_iter().map(Card::question).collect()
    }

    #[test]
    fn draft_rejects_blank_topic() {
        let err = DeckDraft::new("   ")
            .assign_id(DeckId::new(1), fixed_now())
            .unwrap_err();
        assert_eq!(err, DeckError::EmptyTopic);
    }

    #[test]
    fn draft_sorts_and_renumbers_cards() {
        let deck = build_deck();
        assert_eq!(deck.topic(), "Capitals");
        assert_eq!(questions(&deck), vec!["France?", "Italy?", "Spain?"]);
        let orders: Vec<i64> = deck.sorted_cards().iter().map(Card::order).collect();
        assert_eq!(orders, vec![1, 2, 3]);
        assert_eq!(deck.sorted_cards()[0].id(), CardId::new(1));
    }

    #[test]
    fn new_rejects_duplicate_orders() {
        let cards = vec![
            Card::new(CardId::new(1), 5, "a", "b"),
            Card::new(CardId::new(2), 5, "c", "d"),
        ];
        let err = Deck::new(
            DeckId::new(1),
            "Dupes",
            Difficulty::Easy,
            BloomLevel::Remember,
            DeckFormat::Qa,
            InputKind::Text,
            cards,
            fixed_now(),
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, DeckError::DuplicateOrder(5));
    }

    #[test]
    fn new_rejects_duplicate_ids() {
        let cards = vec![
            Card::new(CardId::new(1), 1, "a", "b"),
            Card::new(CardId::new(1), 2, "c", "d"),
        ];
        let err = Deck::new(
            DeckId::new(1),
            "Dupes",
            Difficulty::Easy,
            BloomLevel::Remember,
            DeckFormat::Qa,
            InputKind::Text,
            cards,
            fixed_now(),
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, DeckError::DuplicateCardId(CardId::new(1)));
    }

    #[test]
    fn sorted_cards_follow_non_contiguous_orders() {
        let cards = vec![
            Card::new(CardId::new(1), 40, "last", ""),
            Card::new(CardId::new(2), -3, "first", ""),
            Card::new(CardId::new(3), 7, "middle", ""),
        ];
        let deck = Deck::new(
            DeckId::new(9),
            "Sparse",
            Difficulty::Medium,
            BloomLevel::Understand,
            DeckFormat::Qa,
            InputKind::Text,
            cards,
            fixed_now(),
            fixed_now(),
        )
        .unwrap();
        let sorted: Vec<String> = deck
            .sorted_cards()
            .iter()
            .map(|c| c.question().to_owned())
            .collect();
        assert_eq!(sorted, vec!["first", "middle", "last"]);
    }

    #[test]
    fn update_card_bumps_updated_at() {
        let mut deck = build_deck();
        let later = fixed_now() + Duration::minutes(1);
        deck.update_card(CardId::new(2), "Italia?", "Roma", later)
            .unwrap();
        assert_eq!(deck.card(CardId::new(2)).unwrap().answer(), "Roma");
        assert_eq!(deck.updated_at(), later);
        assert_eq!(deck.created_at(), fixed_now());
    }

    #[test]
    fn update_unknown_card_fails() {
        let mut deck = build_deck();
        let err = deck
            .update_card(CardId::new(99), "q", "a", fixed_now())
            .unwrap_err();
        assert_eq!(err, DeckError::UnknownCard(CardId::new(99)));
    }

    #[test]
    fn remove_card_renumbers() {
        let mut deck = build_deck();
        deck.remove_card(CardId::new(1), fixed_now()).unwrap();
        assert_eq!(questions(&deck), vec!["Italy?", "Spain?"]);
        let orders: Vec<i64> = deck.sorted_cards().iter().map(Card::order).collect();
        assert_eq!(orders, vec![1, 2]);
    }

    #[test]
    fn move_card_swaps_with_neighbour() {
        let mut deck = build_deck();
        assert!(deck.move_card(CardId::new(3), MoveDirection::Up, fixed_now()));
        assert_eq!(questions(&deck), vec!["France?", "Spain?", "Italy?"]);
        assert!(deck.move_card(CardId::new(1), MoveDirection::Down, fixed_now()));
        assert_eq!(questions(&deck), vec!["Spain?", "France?", "Italy?"]);
    }

    #[test]
    fn move_card_is_noop_at_edges() {
        let mut deck = build_deck();
        let before = deck.clone();
        assert!(!deck.move_card(CardId::new(1), MoveDirection::Up, fixed_now()));
        assert!(!deck.move_card(CardId::new(3), MoveDirection::Down, fixed_now()));
        assert!(!deck.move_card(CardId::new(42), MoveDirection::Down, fixed_now()));
        assert_eq!(questions(&deck), questions(&before));
    }

    #[test]
    fn add_blank_card_goes_last() {
        let mut deck = build_deck();
        let id = deck.add_blank_card(fixed_now());
        assert_eq!(id, CardId::new(4));
        let last = deck.sorted_cards().pop().unwrap();
        assert_eq!(last.id(), id);
        assert_eq!(last.order(), 4);
        assert!(last.question().is_empty());
    }

    #[test]
    fn replace_cards_uses_fresh_ids() {
        let mut deck = build_deck();
        deck.replace_cards(
            vec![CardDraft::new(2, "B", "b"), CardDraft::new(1, "A", "a")],
            fixed_now(),
        );
        assert_eq!(questions(&deck), vec!["A", "B"]);
        assert!(deck.card(CardId::new(1)).is_none());
        assert!(deck.card(CardId::new(4)).is_some());
    }
}
