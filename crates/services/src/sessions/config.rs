use thiserror::Error;

/// Lowest accepted per-question time limit, in seconds.
pub const MIN_SECONDS_PER_QUESTION: u32 = 5;
/// Highest accepted per-question time limit, in seconds.
pub const MAX_SECONDS_PER_QUESTION: u32 = 300;
/// Time limit offered before the user changes it.
pub const DEFAULT_SECONDS_PER_QUESTION: u32 = 30;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionConfigError {
    #[error(
        "seconds per question must be between {MIN_SECONDS_PER_QUESTION} and {MAX_SECONDS_PER_QUESTION}, got {0}"
    )]
    SecondsOutOfRange(u32),
}

/// Order in which a session presents the deck's cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderMode {
    #[default]
    Ordered,
    Random,
}

/// Options chosen on the pre-session screen; fixed while a session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    order_mode: OrderMode,
    timed: bool,
    seconds_per_question: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            order_mode: OrderMode::Ordered,
            timed: false,
            seconds_per_question: DEFAULT_SECONDS_PER_QUESTION,
        }
    }
}

impl SessionConfig {
    /// # Errors
    ///
    /// Returns `SessionConfigError::SecondsOutOfRange` when `seconds_per_question`
    /// is outside `[5, 300]`, whether or not the session is timed.
    pub fn new(
        order_mode: OrderMode,
        timed: bool,
        seconds_per_question: u32,
    ) -> Result<Self, SessionConfigError> {
        if !(MIN_SECONDS_PER_QUESTION..=MAX_SECONDS_PER_QUESTION).contains(&seconds_per_question) {
            return Err(SessionConfigError::SecondsOutOfRange(seconds_per_question));
        }
        Ok(Self {
            order_mode,
            timed,
            seconds_per_question,
        })
    }

    /// Like [`SessionConfig::new`], but pulls an out-of-range limit into `[5, 300]`.
    #[must_use]
    pub fn clamped(order_mode: OrderMode, timed: bool, seconds_per_question: u32) -> Self {
        Self {
            order_mode,
            timed,
            seconds_per_question: seconds_per_question
                .clamp(MIN_SECONDS_PER_QUESTION, MAX_SECONDS_PER_QUESTION),
        }
    }

    #[must_use]
    pub fn order_mode(&self) -> OrderMode {
        self.order_mode
    }

    #[must_use]
    pub fn timed(&self) -> bool {
        self.timed
    }

    #[must_use]
    pub fn seconds_per_question(&self) -> u32 {
        self.seconds_per_question
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_ordered_untimed_thirty_seconds() {
        let config = SessionConfig::default();
        assert_eq!(config.order_mode(), OrderMode::Ordered);
        assert!(!config.timed());
        assert_eq!(config.seconds_per_question(), 30);
    }

    #[test]
    fn new_rejects_out_of_range_seconds() {
        assert_eq!(
            SessionConfig::new(OrderMode::Random, true, 4).unwrap_err(),
            SessionConfigError::SecondsOutOfRange(4)
        );
        assert_eq!(
            SessionConfig::new(OrderMode::Random, true, 301).unwrap_err(),
            SessionConfigError::SecondsOutOfRange(301)
        );
        assert!(SessionConfig::new(OrderMode::Random, true, 5).is_ok());
        assert!(SessionConfig::new(OrderMode::Random, true, 300).is_ok());
    }

    #[test]
    fn clamped_pulls_into_range() {
        assert_eq!(SessionConfig::clamped(OrderMode::Ordered, true, 0).seconds_per_question(), 5);
        assert_eq!(
            SessionConfig::clamped(OrderMode::Ordered, true, 9_000).seconds_per_question(),
            300
        );
        assert_eq!(SessionConfig::clamped(OrderMode::Ordered, true, 42).seconds_per_question(), 42);
    }
}
