mod config;
mod plan;
mod progress;
mod service;
mod timer;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use config::{
    DEFAULT_SECONDS_PER_QUESTION, MAX_SECONDS_PER_QUESTION, MIN_SECONDS_PER_QUESTION, OrderMode,
    SessionConfig, SessionConfigError,
};
pub use plan::{playback_sequence, shuffle};
pub use progress::{SessionProgress, progress_percent};
pub use service::{Direction, SessionPhase, StudySession};
pub use timer::{ManualScheduler, TickScheduler, TimerToken, TokioTickScheduler};
pub use view::{Controls, SessionView};
pub use workflow::StudyLoopService;
