use std::sync::Arc;

use tracing::info;

use flashdeck_core::model::{Deck, DeckId};
use storage::repository::DeckRepository;

use super::config::SessionConfig;
use super::service::StudySession;
use super::timer::TickScheduler;
use crate::error::StudyError;

/// Loads decks from storage and hands them to study sessions.
///
/// The session itself never touches storage; it only sees the `Deck` read
/// here at start.
#[derive(Clone)]
pub struct StudyLoopService {
    decks: Arc<dyn DeckRepository>,
}

impl StudyLoopService {
    #[must_use]
    pub fn new(decks: Arc<dyn DeckRepository>) -> Self {
        Self { decks }
    }

    /// Fetch the deck a session will run over.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::DeckNotFound` when the deck does not exist.
    /// Returns `StudyError::Storage` if repository access fails.
    pub async fn load_deck(&self, deck_id: DeckId) -> Result<Deck, StudyError> {
        self.decks
            .get_deck(deck_id)
            .await?
            .ok_or(StudyError::DeckNotFound(deck_id))
    }

    /// Start a new session for the given deck.
    ///
    /// # Errors
    ///
    /// Returns `StudyError` if the deck cannot be loaded.
    pub async fn start_session<S: TickScheduler>(
        &self,
        deck_id: DeckId,
        config: SessionConfig,
        scheduler: S,
    ) -> Result<StudySession<S>, StudyError> {
        let deck = self.load_deck(deck_id).await?;
        let mut session = StudySession::new(scheduler);
        session.start(config, &deck);
        Ok(session)
    }

    /// Start `session` again with its current configuration.
    ///
    /// The deck is read afresh, so edits made since the previous run are
    /// picked up. A running session is reset to setup first.
    ///
    /// # Errors
    ///
    /// Returns `StudyError` if the deck cannot be loaded. The session is left
    /// on its setup screen in that case.
    pub async fn start_from_config<S: TickScheduler>(
        &self,
        session: &mut StudySession<S>,
        deck_id: DeckId,
    ) -> Result<(), StudyError> {
        session.restart();
        let deck = self.load_deck(deck_id).await?;
        session.start(session.config(), &deck);
        info!(deck_id = %deck_id, "study session restarted from config");
        Ok(())
    }
}
