/// Where the learner is within the playback sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionProgress {
    /// 1-based position of the visible card, 0 when there are no cards.
    pub position: usize,
    pub total: usize,
    pub percent: u8,
}

impl SessionProgress {
    #[must_use]
    pub fn new(current_index: usize, total: usize) -> Self {
        if total == 0 {
            return Self {
                position: 0,
                total: 0,
                percent: 0,
            };
        }
        Self {
            position: current_index + 1,
            total,
            percent: progress_percent(current_index, total),
        }
    }
}

/// `round(100 * (index + 1) / total)` with halves rounded up; 0 for an empty sequence.
#[must_use]
pub fn progress_percent(current_index: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let seen = (current_index + 1).min(total);
    let rounded = (200 * seen + total) / (2 * total);
    u8::try_from(rounded).unwrap_or(100)
}
