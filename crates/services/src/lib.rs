#![forbid(unsafe_code)]

pub mod app_services;
pub mod deck_service;
pub mod error;
pub mod generation;
pub mod rate_limit;
pub mod sessions;

pub use flashdeck_core::Clock;

pub use app_services::AppServices;
pub use deck_service::{DeckService, TopicGroup};
pub use error::{AppServicesError, DeckServiceError, GenerationError, StudyError};
pub use generation::{
    CardGenerator, GeneratedCards, GenerationConfig, GenerationRequest, GenerationService,
    OpenAiCardGenerator,
};
pub use rate_limit::RateLimiter;
pub use sessions::{
    Controls, Direction, ManualScheduler, OrderMode, SessionConfig, SessionConfigError,
    SessionPhase, SessionView, StudyLoopService, StudySession, TickScheduler, TimerToken,
    TokioTickScheduler,
};
