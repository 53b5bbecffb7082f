use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::deck_service::DeckService;
use crate::error::AppServicesError;
use crate::generation::GenerationService;
use crate::sessions::StudyLoopService;

/// Assembles the app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    decks: Arc<DeckService>,
    study_loop: Arc<StudyLoopService>,
    generation: Arc<GenerationService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock))
    }

    /// Build services over in-memory storage.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock)
    }

    fn from_storage(storage: &Storage, clock: Clock) -> Self {
        let decks = DeckService::new(clock, Arc::clone(&storage.decks));
        let study_loop = StudyLoopService::new(Arc::clone(&storage.decks));
        let generation = GenerationService::from_env(clock, decks.clone());
        Self {
            decks: Arc::new(decks),
            study_loop: Arc::new(study_loop),
            generation: Arc::new(generation),
        }
    }

    #[must_use]
    pub fn decks(&self) -> Arc<DeckService> {
        Arc::clone(&self.decks)
    }

    #[must_use]
    pub fn study_loop(&self) -> Arc<StudyLoopService> {
        Arc::clone(&self.study_loop)
    }

    #[must_use]
    pub fn generation(&self) -> Arc<GenerationService> {
        Arc::clone(&self.generation)
    }
}
