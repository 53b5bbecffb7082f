use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Handle for one scheduled tick.
///
/// The scheduler hands the token back to its host when the delay elapses; the
/// host forwards it to `StudySession::on_tick`, which ignores any token that is
/// no longer the one it armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(u64);

impl TimerToken {
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

/// One-shot timer capability injected into a study session.
pub trait TickScheduler {
    /// Arrange for a fresh token to fire once `after` has elapsed.
    fn schedule(&mut self, after: Duration) -> TimerToken;

    /// Drop a pending token. Unknown or already fired tokens are ignored.
    fn cancel(&mut self, token: TimerToken);
}

//
// ─── SIMULATED CLOCK ───────────────────────────────────────────────────────────
//

/// Scheduler driven by explicit `advance` calls instead of wall-clock time.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    elapsed: Duration,
    next_token: u64,
    pending: BTreeMap<TimerToken, Duration>,
}

impl ManualScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulated time since creation.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Number of tokens scheduled and neither fired nor cancelled.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Moves simulated time forward and returns the tokens that came due,
    /// earliest first.
    pub fn advance(&mut self, by: Duration) -> Vec<TimerToken> {
        self.elapsed += by;
        let mut due: Vec<(Duration, TimerToken)> = self
            .pending
            .iter()
            .filter(|(_, at)| **at <= self.elapsed)
            .map(|(token, at)| (*at, *token))
            .collect();
        due.sort();
        for (_, token) in &due {
            self.pending.remove(token);
        }
        due.into_iter().map(|(_, token)| token).collect()
    }
}

impl TickScheduler for ManualScheduler {
    fn schedule(&mut self, after: Duration) -> TimerToken {
        self.next_token += 1;
        let token = TimerToken(self.next_token);
        self.pending.insert(token, self.elapsed + after);
        token
    }

    fn cancel(&mut self, token: TimerToken) {
        self.pending.remove(&token);
    }
}

//
// ─── TOKIO ─────────────────────────────────────────────────────────────────────
//

/// Scheduler backed by tokio sleeps; fired tokens arrive on an mpsc channel.
///
/// Each scheduled tick is its own task, aborted on `cancel` or drop.
#[derive(Debug)]
pub struct TokioTickScheduler {
    tx: mpsc::UnboundedSender<TimerToken>,
    next_token: u64,
    tasks: HashMap<TimerToken, JoinHandle<()>>,
}

impl TokioTickScheduler {
    /// Creates a scheduler and the receiver its ticks are delivered on.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TimerToken>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            tx,
            next_token: 0,
            tasks: HashMap::new(),
        };
        (scheduler, rx)
    }
}

impl TickScheduler for TokioTickScheduler {
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    fn schedule(&mut self, after: Duration) -> TimerToken {
        self.tasks.retain(|_, handle| !handle.is_finished());

        self.next_token += 1;
        let token = TimerToken(self.next_token);
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            // Receiver gone means the host stopped listening.
            let _ = tx.send(token);
        });
        self.tasks.insert(token, handle);
        token
    }

    fn cancel(&mut self, token: TimerToken) {
        if let Some(handle) = self.tasks.remove(&token) {
            handle.abort();
        }
    }
}

impl Drop for TokioTickScheduler {
    fn drop(&mut self) {
        for (_, handle) in self.tasks.drain() {
            handle.abort();
        }
    }
}
