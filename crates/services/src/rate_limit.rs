use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};

/// Requests allowed per window when no limit is configured.
pub const DEFAULT_MAX_REQUESTS: usize = 10;

/// Sliding-window request limiter.
///
/// Each accepted request is recorded with its timestamp; a request is accepted
/// while fewer than `max_requests` recorded ones fall inside the trailing
/// `window`. Timestamps come from the caller so a fixed `Clock` drives tests.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    hits: Mutex<VecDeque<DateTime<Utc>>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, Duration::hours(1))
    }
}

impl RateLimiter {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            hits: Mutex::new(VecDeque::with_capacity(max_requests)),
        }
    }

    /// Records a request at `now` and returns whether it is allowed.
    ///
    /// Rejected requests are not recorded.
    pub fn check(&self, now: DateTime<Utc>) -> bool {
        let mut hits = self.hits.lock().unwrap_or_else(PoisonError::into_inner);
        self.expire(&mut hits, now);
        if hits.len() >= self.max_requests {
            return false;
        }
        hits.push_back(now);
        true
    }

    /// Requests still allowed in the window ending at `now`.
    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> usize {
        let mut hits = self.hits.lock().unwrap_or_else(PoisonError::into_inner);
        self.expire(&mut hits, now);
        self.max_requests.saturating_sub(hits.len())
    }

    fn expire(&self, hits: &mut VecDeque<DateTime<Utc>>, now: DateTime<Utc>) {
        while hits.front().is_some_and(|at| now - *at >= self.window) {
            hits.pop_front();
        }
    }
}
