use std::fmt;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, info};

use flashdeck_core::model::{Card, Deck, DeckFormat, DeckId};

use super::config::SessionConfig;
use super::plan::playback_sequence;
use super::progress::SessionProgress;
use super::timer::{TickScheduler, TimerToken};

const TICK: Duration = Duration::from_secs(1);

/// Lifecycle of a study session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    NotStarted,
    InProgress,
    Finished,
}

/// Step direction for [`StudySession::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// State machine for one run through a deck.
///
/// Commands issued in the wrong phase, or against an empty sequence, are
/// ignored rather than rejected. Index arguments are clamped into range.
///
/// At most one tick is armed at a time. Every command that changes the
/// visible card or the phase cancels it before applying its own effect, and a
/// tick whose token is not the armed one is dropped in [`StudySession::on_tick`].
pub struct StudySession<S: TickScheduler> {
    scheduler: S,
    config: SessionConfig,
    deck_id: Option<DeckId>,
    format: DeckFormat,
    phase: SessionPhase,
    sequence: Vec<Card>,
    current: usize,
    revealed: bool,
    remaining_secs: u32,
    armed: Option<TimerToken>,
}

impl<S: TickScheduler> StudySession<S> {
    /// A session waiting on its configuration screen.
    #[must_use]
    pub fn new(scheduler: S) -> Self {
        let config = SessionConfig::default();
        Self {
            scheduler,
            config,
            deck_id: None,
            format: DeckFormat::default(),
            phase: SessionPhase::NotStarted,
            sequence: Vec::new(),
            current: 0,
            revealed: false,
            remaining_secs: config.seconds_per_question(),
            armed: None,
        }
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// The most recent configuration; still readable after `restart`.
    #[must_use]
    pub fn config(&self) -> SessionConfig {
        self.config
    }

    /// Edits the configuration ahead of the next `start`.
    ///
    /// Ignored unless the session is `NotStarted`.
    pub fn set_config(&mut self, config: SessionConfig) {
        if self.phase != SessionPhase::NotStarted {
            debug!(phase = ?self.phase, "ignoring config change outside the setup screen");
            return;
        }
        self.config = config;
        self.remaining_secs = config.seconds_per_question();
    }

    /// Deck the current or last session was started from.
    #[must_use]
    pub fn deck_id(&self) -> Option<DeckId> {
        self.deck_id
    }

    #[must_use]
    pub fn format(&self) -> DeckFormat {
        self.format
    }

    #[must_use]
    pub fn sequence(&self) -> &[Card] {
        &self.sequence
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_card(&self) -> Option<&Card> {
        if self.phase == SessionPhase::NotStarted {
            return None;
        }
        self.sequence.get(self.current)
    }

    #[must_use]
    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    /// Seconds left on the visible question; `None` for untimed sessions.
    #[must_use]
    pub fn remaining_secs(&self) -> Option<u32> {
        self.config.timed().then_some(self.remaining_secs)
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        if self.phase == SessionPhase::NotStarted {
            return SessionProgress::new(0, 0);
        }
        SessionProgress::new(self.current, self.sequence.len())
    }

    /// True while a tick is outstanding for the visible card.
    #[must_use]
    pub fn timer_armed(&self) -> bool {
        self.armed.is_some()
    }

    #[must_use]
    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    fn is_last(&self) -> bool {
        self.current + 1 == self.sequence.len()
    }

    //
    // ─── COMMANDS ──────────────────────────────────────────────────────────────
    //

    /// Starts a session with a thread-local random source for shuffling.
    pub fn start(&mut self, config: SessionConfig, deck: &Deck) {
        self.start_with_rng(config, deck, &mut rand::rng());
    }

    /// Starts a session, shuffling (in `Random` mode) with the given source.
    ///
    /// Only valid from `NotStarted`. An empty deck yields an in-progress
    /// session with nothing to show.
    pub fn start_with_rng<R: Rng + ?Sized>(
        &mut self,
        config: SessionConfig,
        deck: &Deck,
        rng: &mut R,
    ) {
        if self.phase != SessionPhase::NotStarted {
            debug!(phase = ?self.phase, "ignoring start outside the setup screen");
            return;
        }

        self.config = config;
        self.deck_id = Some(deck.id());
        self.format = deck.format();
        self.sequence = playback_sequence(deck, config.order_mode(), rng);
        self.phase = SessionPhase::InProgress;
        self.show_card(0);

        info!(
            deck_id = %deck.id(),
            cards = self.sequence.len(),
            order = ?config.order_mode(),
            timed = config.timed(),
            seconds = config.seconds_per_question(),
            "study session started"
        );
    }

    /// Shows the answer of the visible card and stops its countdown.
    pub fn reveal(&mut self) {
        if !self.accepts_navigation("reveal") || self.revealed {
            return;
        }
        self.disarm();
        self.revealed = true;
    }

    /// Steps one card forward or back, clamped at either end.
    ///
    /// A clamped step still hides the answer and restarts the countdown.
    pub fn advance(&mut self, direction: Direction) {
        if !self.accepts_navigation("advance") {
            return;
        }
        let target = match direction {
            Direction::Next => self.current.saturating_add(1),
            Direction::Previous => self.current.saturating_sub(1),
        };
        self.show_card(target);
    }

    /// Jumps to `index`, clamped into the sequence.
    pub fn goto_index(&mut self, index: usize) {
        if !self.accepts_navigation("goto") {
            return;
        }
        self.show_card(index);
    }

    /// Ends the session. Only accepted on the last card once it is revealed.
    pub fn finish(&mut self) {
        if !self.accepts_navigation("finish") {
            return;
        }
        if !self.is_last() || !self.revealed {
            debug!(
                index = self.current,
                revealed = self.revealed,
                "ignoring finish before the last answer is shown"
            );
            return;
        }
        self.disarm();
        self.phase = SessionPhase::Finished;
        info!(cards = self.sequence.len(), "study session finished");
    }

    /// Returns to the setup screen, keeping the configuration for editing.
    pub fn restart(&mut self) {
        self.disarm();
        self.phase = SessionPhase::NotStarted;
        self.sequence.clear();
        self.current = 0;
        self.revealed = false;
        self.remaining_secs = self.config.seconds_per_question();
        debug!("study session reset to setup");
    }

    /// Delivers a fired tick. Tokens other than the armed one are stale and ignored.
    pub fn on_tick(&mut self, token: TimerToken) {
        if self.armed != Some(token) || self.phase != SessionPhase::InProgress {
            debug!(token = token.value(), "dropping stale tick");
            return;
        }
        self.armed = None;
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.revealed = true;
            debug!(index = self.current, "time up, answer revealed");
        } else {
            self.arm();
        }
    }

    //
    // ─── INTERNALS ─────────────────────────────────────────────────────────────
    //

    fn accepts_navigation(&self, command: &'static str) -> bool {
        if self.phase != SessionPhase::InProgress {
            debug!(command, phase = ?self.phase, "ignoring command outside a running session");
            return false;
        }
        if self.sequence.is_empty() {
            debug!(command, "ignoring command on an empty session");
            return false;
        }
        true
    }

    /// Makes `index` (clamped) the visible card with its answer hidden and a
    /// fresh countdown.
    fn show_card(&mut self, index: usize) {
        self.disarm();
        self.current = index.min(self.sequence.len().saturating_sub(1));
        self.revealed = false;
        self.remaining_secs = self.config.seconds_per_question();
        self.arm();
    }

    fn arm(&mut self) {
        if self.config.timed()
            && self.phase == SessionPhase::InProgress
            && !self.revealed
            && !self.sequence.is_empty()
        {
            self.armed = Some(self.scheduler.schedule(TICK));
        }
    }

    fn disarm(&mut self) {
        if let Some(token) = self.armed.take() {
            self.scheduler.cancel(token);
        }
    }
}

impl<S: TickScheduler> Drop for StudySession<S> {
    fn drop(&mut self) {
        self.disarm();
    }
}

impl<S: TickScheduler> fmt::Debug for StudySession<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StudySession")
            .field("phase", &self.phase)
            .field("deck_id", &self.deck_id)
            .field("cards_len", &self.sequence.len())
            .field("current", &self.current)
            .field("revealed", &self.revealed)
            .field("remaining_secs", &self.remaining_secs)
            .field("armed", &self.armed)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::config::OrderMode;
    use crate::sessions::timer::ManualScheduler;
    use flashdeck_core::model::{CardDraft, DeckDraft};
    use flashdeck_core::time::fixed_now;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn build_deck(n: i64) -> Deck {
        let cards = (1..=n)
            .map(|i| CardDraft::new(i, format!("Q{i}"), format!("A{i}")))
            .collect();
        DeckDraft::new("Test")
            .with_cards(cards)
            .assign_id(DeckId::new(1), fixed_now())
            .unwrap()
    }

    fn timed(seconds: u32) -> SessionConfig {
        SessionConfig::new(OrderMode::Ordered, true, seconds).unwrap()
    }

    fn started(n: i64, config: SessionConfig) -> StudySession<ManualScheduler> {
        let mut session = StudySession::new(ManualScheduler::new());
        session.start(config, &build_deck(n));
        session
    }

    /// Advances simulated time one second at a time, delivering fired ticks.
    fn tick(session: &mut StudySession<ManualScheduler>, seconds: u32) {
        for _ in 0..seconds {
            let fired = session.scheduler_mut().advance(TICK);
            for token in fired {
                session.on_tick(token);
            }
        }
    }

    fn questions(session: &StudySession<ManualScheduler>) -> Vec<String> {
        session
            .sequence()
            .iter()
            .map(|c| c.question().to_owned())
            .collect()
    }

    #[test]
    fn start_enters_in_progress_at_first_card() {
        let session = started(3, SessionConfig::default());
        assert_eq!(session.phase(), SessionPhase::InProgress);
        assert_eq!(session.current_index(), 0);
        assert!(!session.is_revealed());
        assert_eq!(session.current_card().unwrap().question(), "Q1");
        assert_eq!(session.remaining_secs(), None);
        assert!(!session.timer_armed());
    }

    #[test]
    fn new_session_has_nothing_to_show() {
        let session = StudySession::new(ManualScheduler::new());
        assert_eq!(session.phase(), SessionPhase::NotStarted);
        assert!(session.current_card().is_none());
        assert_eq!(session.progress().total, 0);
    }

    #[test]
    fn advance_is_clamped_at_both_ends() {
        let mut session = started(3, SessionConfig::default());
        session.advance(Direction::Previous);
        assert_eq!(session.current_index(), 0);

        session.goto_index(2);
        session.reveal();
        session.advance(Direction::Next);
        assert_eq!(session.current_index(), 2);
        assert!(!session.is_revealed());
    }

    #[test]
    fn changing_card_hides_answer() {
        let mut session = started(3, SessionConfig::default());
        session.reveal();
        session.advance(Direction::Next);
        assert!(!session.is_revealed());

        session.reveal();
        session.goto_index(0);
        assert!(!session.is_revealed());
        assert_eq!(session.current_index(), 0);
    }

    #[test]
    fn goto_clamps_large_index() {
        let mut session = started(4, SessionConfig::default());
        session.goto_index(usize::MAX);
        assert_eq!(session.current_index(), 3);
    }

    #[test]
    fn timeout_reveals_answer() {
        let mut session = started(2, timed(5));
        assert_eq!(session.remaining_secs(), Some(5));

        tick(&mut session, 4);
        assert_eq!(session.remaining_secs(), Some(1));
        assert!(!session.is_revealed());

        tick(&mut session, 1);
        assert!(session.is_revealed());
        assert_eq!(session.remaining_secs(), Some(0));
        assert!(!session.timer_armed());

        tick(&mut session, 3);
        assert_eq!(session.remaining_secs(), Some(0));
    }

    #[test]
    fn reveal_stops_countdown() {
        let mut session = started(2, timed(10));
        tick(&mut session, 3);
        session.reveal();
        assert_eq!(session.scheduler().pending(), 0);

        tick(&mut session, 20);
        assert_eq!(session.remaining_secs(), Some(7));
        assert!(session.is_revealed());
    }

    #[test]
    fn navigation_restarts_countdown() {
        let mut session = started(3, timed(5));
        tick(&mut session, 3);
        session.advance(Direction::Next);
        assert_eq!(session.remaining_secs(), Some(5));
        assert_eq!(session.scheduler().pending(), 1);

        // A clamped step on the first card still rearms.
        session.goto_index(0);
        tick(&mut session, 2);
        session.advance(Direction::Previous);
        assert_eq!(session.remaining_secs(), Some(5));
        assert!(session.timer_armed());
    }

    #[test]
    fn stale_token_is_ignored() {
        let mut session = started(3, timed(5));
        let stale = session.armed.unwrap();
        session.advance(Direction::Next);

        session.on_tick(stale);
        assert_eq!(session.remaining_secs(), Some(5));
        assert_eq!(session.scheduler().pending(), 1);
    }

    #[test]
    fn finish_requires_revealed_last_card() {
        let mut session = started(2, SessionConfig::default());
        session.finish();
        assert_eq!(session.phase(), SessionPhase::InProgress);

        session.advance(Direction::Next);
        session.finish();
        assert_eq!(session.phase(), SessionPhase::InProgress);

        session.reveal();
        session.finish();
        assert_eq!(session.phase(), SessionPhase::Finished);
    }

    #[test]
    fn finished_session_ignores_navigation() {
        let mut session = started(1, timed(5));
        session.reveal();
        session.finish();

        session.advance(Direction::Previous);
        session.goto_index(0);
        session.reveal();
        tick(&mut session, 10);
        assert_eq!(session.phase(), SessionPhase::Finished);
        assert!(!session.timer_armed());
        assert_eq!(session.scheduler().pending(), 0);
    }

    #[test]
    fn finish_cancels_timer_on_auto_revealed_card() {
        let mut session = started(1, timed(5));
        tick(&mut session, 5);
        session.finish();
        assert_eq!(session.phase(), SessionPhase::Finished);
    }

    #[test]
    fn restart_cancels_timer_and_keeps_config() {
        let config = SessionConfig::new(OrderMode::Random, true, 12).unwrap();
        let mut session = started(3, config);
        tick(&mut session, 2);
        session.restart();

        assert_eq!(session.phase(), SessionPhase::NotStarted);
        assert_eq!(session.config(), config);
        assert_eq!(session.scheduler().pending(), 0);
        tick(&mut session, 20);
        assert_eq!(session.phase(), SessionPhase::NotStarted);
    }

    #[test]
    fn commands_before_start_are_ignored() {
        let mut session = StudySession::new(ManualScheduler::new());
        session.reveal();
        session.advance(Direction::Next);
        session.goto_index(3);
        session.finish();
        assert_eq!(session.phase(), SessionPhase::NotStarted);
        assert!(!session.is_revealed());
    }

    #[test]
    fn start_is_ignored_while_running() {
        let mut session = started(3, SessionConfig::default());
        session.goto_index(2);
        session.start(SessionConfig::default(), &build_deck(5));
        assert_eq!(session.sequence().len(), 3);
        assert_eq!(session.current_index(), 2);
    }

    #[test]
    fn set_config_only_applies_before_start() {
        let mut session = started(2, SessionConfig::default());
        session.set_config(timed(9));
        assert!(!session.config().timed());

        session.restart();
        session.set_config(timed(9));
        assert_eq!(session.config(), timed(9));
    }

    #[test]
    fn empty_deck_runs_without_cards() {
        let mut session = started(0, timed(5));
        assert_eq!(session.phase(), SessionPhase::InProgress);
        assert!(session.current_card().is_none());
        assert!(!session.timer_armed());

        session.reveal();
        session.advance(Direction::Next);
        session.advance(Direction::Previous);
        session.goto_index(4);
        session.finish();
        tick(&mut session, 10);

        assert_eq!(session.phase(), SessionPhase::InProgress);
        assert_eq!(session.current_index(), 0);
        assert!(!session.is_revealed());
        let progress = session.progress();
        assert_eq!((progress.position, progress.total, progress.percent), (0, 0, 0));
    }

    #[test]
    fn random_restart_reshuffles_same_cards() {
        let deck = build_deck(12);
        let config = SessionConfig::new(OrderMode::Random, false, 30).unwrap();
        let mut session = StudySession::new(ManualScheduler::new());

        session.start_with_rng(config, &deck, &mut StdRng::seed_from_u64(1));
        let first = questions(&session);
        session.restart();
        session.start_with_rng(config, &deck, &mut StdRng::seed_from_u64(2));
        let second = questions(&session);

        assert_ne!(first, second);
        let mut a = first.clone();
        let mut b = second.clone();
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }

    #[test]
    fn ordered_start_uses_card_order() {
        let session = started(5, SessionConfig::default());
        assert_eq!(questions(&session), vec!["Q1", "Q2", "Q3", "Q4", "Q5"]);
    }

    #[test]
    fn drop_cancels_pending_tick() {
        struct Counting<'a> {
            cancelled: &'a std::cell::Cell<u32>,
            inner: ManualScheduler,
        }
        impl TickScheduler for Counting<'_> {
            fn schedule(&mut self, after: Duration) -> TimerToken {
                self.inner.schedule(after)
            }
            fn cancel(&mut self, token: TimerToken) {
                self.cancelled.set(self.cancelled.get() + 1);
                self.inner.cancel(token);
            }
        }

        let cancelled = std::cell::Cell::new(0);
        {
            let mut session = StudySession::new(Counting {
                cancelled: &cancelled,
                inner: ManualScheduler::new(),
            });
            session.start(timed(5), &build_deck(2));
        }
        assert_eq!(cancelled.get(), 1);
    }
}
