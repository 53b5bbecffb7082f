use std::sync::Arc;

use tracing::{info, warn};

use flashdeck_core::model::{CardId, Deck, DeckDraft, DeckId};

use super::{
    CardGenerator, GeneratedCards, GenerationConfig, GenerationRequest, OpenAiCardGenerator,
};
use crate::Clock;
use crate::deck_service::DeckService;
use crate::error::GenerationError;
use crate::rate_limit::RateLimiter;

/// Turns generation requests into persisted decks and card edits.
///
/// Each call that reaches the generator first passes the shared rate limiter.
#[derive(Clone)]
pub struct GenerationService {
    clock: Clock,
    generator: Option<Arc<dyn CardGenerator>>,
    decks: DeckService,
    limiter: Arc<RateLimiter>,
}

impl GenerationService {
    #[must_use]
    pub fn new(clock: Clock, generator: Option<Arc<dyn CardGenerator>>, decks: DeckService) -> Self {
        Self {
            clock,
            generator,
            decks,
            limiter: Arc::new(RateLimiter::default()),
        }
    }

    /// Uses the OpenAI-compatible generator when `FLASHDECK_AI_API_KEY` is set.
    #[must_use]
    pub fn from_env(clock: Clock, decks: DeckService) -> Self {
        let generator = GenerationConfig::from_env()
            .map(|config| Arc::new(OpenAiCardGenerator::new(config)) as Arc<dyn CardGenerator>);
        Self::new(clock, generator, decks)
    }

    #[must_use]
    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.generator.is_some()
    }

    /// Requests left in the current rate-limit window.
    #[must_use]
    pub fn remaining_requests(&self) -> usize {
        self.limiter.remaining(self.clock.now())
    }

    /// Generate cards for a new deck and persist it.
    ///
    /// The deck topic is the one suggested by the generator, or the request
    /// topic when that is blank.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError` for invalid requests, rate limiting, generator
    /// failures or persistence failures.
    pub async fn generate_deck(&self, request: &GenerationRequest) -> Result<Deck, GenerationError> {
        let generated = self.run(request).await?;
        let topic = if generated.topic.is_empty() {
            request.topic.trim().to_owned()
        } else {
            generated.topic
        };

        let draft = DeckDraft {
            topic,
            difficulty: request.difficulty,
            bloom_level: request.bloom_level,
            format: request.format,
            input_kind: request.input_kind,
            cards: generated.cards,
        };
        let deck = self.decks.create_deck(draft).await?;
        info!(deck_id = %deck.id(), cards = deck.cards().len(), "generated deck saved");
        Ok(deck)
    }

    /// Replace one card's text with a freshly generated question.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError::CardNotFound` if the card is not in the deck,
    /// or any error from generation or persistence.
    pub async fn regenerate_card(
        &self,
        deck_id: DeckId,
        card_id: CardId,
    ) -> Result<Deck, GenerationError> {
        let deck = self.decks.require_deck(deck_id).await?;
        if deck.card(card_id).is_none() {
            return Err(GenerationError::CardNotFound(card_id));
        }

        let generated = self.run(&GenerationRequest::for_deck(&deck, 1)).await?;
        let Some(card) = generated.cards.into_iter().next() else {
            return Err(GenerationError::EmptyResponse);
        };
        let deck = self
            .decks
            .update_card(deck_id, card_id, card.question, card.answer)
            .await?;
        Ok(deck)
    }

    /// Replace every card with a newly generated set of the same size.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError::InvalidCount` for an empty deck, or any error
    /// from generation or persistence.
    pub async fn regenerate_deck(&self, deck_id: DeckId) -> Result<Deck, GenerationError> {
        let deck = self.decks.require_deck(deck_id).await?;
        let count = u32::try_from(deck.cards().len()).unwrap_or(u32::MAX);
        let generated = self.run(&GenerationRequest::for_deck(&deck, count)).await?;
        let deck = self.decks.replace_cards(deck_id, generated.cards).await?;
        Ok(deck)
    }

    async fn run(&self, request: &GenerationRequest) -> Result<GeneratedCards, GenerationError> {
        request.validate()?;
        let generator = self.generator.as_ref().ok_or(GenerationError::Disabled)?;
        if !self.limiter.check(self.clock.now()) {
            warn!("generation rate limit exceeded");
            return Err(GenerationError::RateLimited);
        }
        generator.generate(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Duration;
    use flashdeck_core::model::{CardDraft, DeckFormat};
    use flashdeck_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    /// Replies with canned cards and records the requests it saw.
    #[derive(Default)]
    struct StubGenerator {
        topic: String,
        seen: Mutex<Vec<GenerationRequest>>,
    }

    #[async_trait]
    impl CardGenerator for StubGenerator {
        async fn generate(
            &self,
            request: &GenerationRequest,
        ) -> Result<GeneratedCards, GenerationError> {
            self.seen.lock().unwrap().push(request.clone());
            let cards = (1..=i64::from(request.question_count))
                .map(|i| CardDraft::new(i, format!("New Q{i}"), format!("New A{i}")))
                .collect();
            Ok(GeneratedCards {
                topic: self.topic.clone(),
                difficulty: None,
                cards,
            })
        }
    }

    fn build(stub: Arc<StubGenerator>, limiter: RateLimiter) -> GenerationService {
        let clock = Clock::Fixed(fixed_now());
        let decks = DeckService::new(clock, Arc::new(InMemoryRepository::new()));
        let generator: Arc<dyn CardGenerator> = stub;
        GenerationService::new(clock, Some(generator), decks).with_rate_limiter(Arc::new(limiter))
    }

    #[tokio::test]
    async fn generate_deck_persists_cards() {
        let stub = Arc::new(StubGenerator {
            topic: "Capitals".into(),
            ..StubGenerator::default()
        });
        let svc = build(stub, RateLimiter::default());
        let mut request = GenerationRequest::new("European capitals", 3);
        request.format = DeckFormat::Cloze;

        let deck = svc.generate_deck(&request).await.unwrap();
        assert_eq!(deck.topic(), "Capitals");
        assert_eq!(deck.format(), DeckFormat::Cloze);
        assert_eq!(deck.cards().len(), 3);
        assert_eq!(svc.remaining_requests(), 9);
    }

    #[tokio::test]
    async fn blank_generated_topic_falls_back_to_request() {
        let svc = build(Arc::new(StubGenerator::default()), RateLimiter::default());
        let deck = svc
            .generate_deck(&GenerationRequest::new("  Borrow checker ", 1))
            .await
            .unwrap();
        assert_eq!(deck.topic(), "Borrow checker");
    }

    #[tokio::test]
    async fn rate_limit_blocks_extra_requests() {
        let svc = build(
            Arc::new(StubGenerator::default()),
            RateLimiter::new(1, Duration::hours(1)),
        );
        svc.generate_deck(&GenerationRequest::new("Rust", 1))
            .await
            .unwrap();
        let err = svc
            .generate_deck(&GenerationRequest::new("Rust", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::RateLimited));
    }

    #[tokio::test]
    async fn invalid_request_does_not_spend_quota() {
        let svc = build(
            Arc::new(StubGenerator::default()),
            RateLimiter::new(1, Duration::hours(1)),
        );
        let err = svc
            .generate_deck(&GenerationRequest::new("", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::EmptyTopic));
        assert_eq!(svc.remaining_requests(), 1);
    }

    #[tokio::test]
    async fn disabled_without_generator() {
        let clock = Clock::Fixed(fixed_now());
        let decks = DeckService::new(clock, Arc::new(InMemoryRepository::new()));
        let svc = GenerationService::new(clock, None, decks);
        assert!(!svc.enabled());
        let err = svc
            .generate_deck(&GenerationRequest::new("Rust", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Disabled));
    }

    #[tokio::test]
    async fn regenerate_card_replaces_text_in_place() {
        let stub = Arc::new(StubGenerator::default());
        let svc = build(stub.clone(), RateLimiter::default());
        let deck = svc
            .generate_deck(&GenerationRequest::new("Rust", 3))
            .await
            .unwrap();
        let target = deck.sorted_cards()[1].clone();

        let updated = svc.regenerate_card(deck.id(), target.id()).await.unwrap();
        let card = updated.card(target.id()).unwrap();
        assert_eq!(card.order(), target.order());
        assert_eq!(card.question(), "New Q1");

        let seen = stub.seen.lock().unwrap();
        assert_eq!(seen.last().unwrap().question_count, 1);
        assert_eq!(seen.last().unwrap().topic, "Rust");
    }

    #[tokio::test]
    async fn regenerate_unknown_card_fails() {
        let svc = build(Arc::new(StubGenerator::default()), RateLimiter::default());
        let deck = svc
            .generate_deck(&GenerationRequest::new("Rust", 1))
            .await
            .unwrap();
        let err = svc
            .regenerate_card(deck.id(), CardId::new(99))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::CardNotFound(_)));
    }

    #[tokio::test]
    async fn regenerate_deck_keeps_card_count() {
        let stub = Arc::new(StubGenerator::default());
        let svc = build(stub.clone(), RateLimiter::default());
        let deck = svc
            .generate_deck(&GenerationRequest::new("Rust", 4))
            .await
            .unwrap();

        let updated = svc.regenerate_deck(deck.id()).await.unwrap();
        assert_eq!(updated.cards().len(), 4);
        assert!(updated.cards().iter().all(|c| c.question().starts_with("New")));
        assert_eq!(stub.seen.lock().unwrap().len(), 2);
    }
}
