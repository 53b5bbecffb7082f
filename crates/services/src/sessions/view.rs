use flashdeck_core::model::{AnswerFace, Card, answer_face};

use super::config::SessionConfig;
use super::progress::SessionProgress;
use super::service::{SessionPhase, StudySession};
use super::timer::TickScheduler;

/// Which commands would move the session right now.
///
/// Disabled commands are still accepted by [`StudySession`]; they are no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Controls {
    pub previous: bool,
    pub reveal: bool,
    pub next: bool,
    pub finish: bool,
}

/// Presentation-agnostic snapshot of a study session.
///
/// Derived on demand from the session and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub phase: SessionPhase,
    pub config: SessionConfig,
    pub progress: SessionProgress,
    pub card: Option<Card>,
    pub revealed: bool,
    /// Countdown for timed sessions.
    pub remaining_secs: Option<u32>,
    /// Present once the visible card is revealed.
    pub answer: Option<AnswerFace>,
    pub controls: Controls,
}

impl SessionView {
    #[must_use]
    pub fn from_session<S: TickScheduler>(session: &StudySession<S>) -> Self {
        let card = session.current_card().cloned();
        let revealed = session.is_revealed();
        let phase = session.phase();

        let answer = card
            .as_ref()
            .filter(|_| revealed)
            .map(|c| answer_face(c.question(), c.answer(), session.format()));

        let controls = match (&card, phase) {
            (Some(_), SessionPhase::InProgress) => {
                let index = session.current_index();
                let is_last = index + 1 == session.sequence().len();
                Controls {
                    previous: index > 0,
                    reveal: !revealed,
                    next: !is_last,
                    finish: is_last && revealed,
                }
            }
            _ => Controls::default(),
        };

        Self {
            phase,
            config: session.config(),
            progress: session.progress(),
            card,
            revealed,
            remaining_secs: session.remaining_secs(),
            answer,
            controls,
        }
    }

    /// Share of the countdown still left, in `0.0..=1.0`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn timer_fraction(&self) -> Option<f32> {
        let remaining = self.remaining_secs?;
        let total = self.config.seconds_per_question();
        Some(remaining as f32 / total as f32)
    }
}

impl<S: TickScheduler> StudySession<S> {
    /// Snapshot for rendering.
    #[must_use]
    pub fn view(&self) -> SessionView {
        SessionView::from_session(self)
    }
}
