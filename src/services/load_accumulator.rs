//! Working-memory bookkeeping.
//!
//! The accumulator only counts. It reports overflow but never decides what
//! to do about it; the circuit breaker owns resets.

use tracing::debug;

use crate::domain::models::{ComplexityScore, LoadSession};

/// Bounded load counter over a [`LoadSession`].
#[derive(Debug, Clone, Copy)]
pub struct LoadAccumulator {
    history_limit: usize,
}

impl Default for LoadAccumulator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_HISTORY_LIMIT)
    }
}

impl LoadAccumulator {
    /// Scores retained per session unless configured otherwise.
    pub const DEFAULT_HISTORY_LIMIT: usize = 50;

    pub fn new(history_limit: usize) -> Self {
        Self {
            history_limit: history_limit.max(2),
        }
    }

    pub const fn history_limit(&self) -> usize {
        self.history_limit
    }

    /// Add a unit's weighted score to the session and return the new total.
    pub fn admit(&self, session: &mut LoadSession, score: ComplexityScore) -> f64 {
        session.accumulated += score.weighted.max(0.0);
        session.peak = session.peak.max(session.accumulated);
        session.admitted_units += 1;
        self.push_history(session, score);
        session.accumulated
    }

    /// Keep a score in history without charging it to the session.
    pub fn record(&self, session: &mut LoadSession, score: ComplexityScore) {
        session.rejected_units += 1;
        self.push_history(session, score);
    }

    /// Set the session's load to `to` (clamped at zero).
    pub fn reset(&self, session: &mut LoadSession, to: f64) {
        session.accumulated = to.max(0.0);
    }

    /// True once the session's load reaches its overflow threshold.
    pub fn is_overflow(session: &LoadSession) -> bool {
        session.accumulated >= session.overflow_threshold
    }

    /// Merge the oldest half of the history into one synthetic entry.
    ///
    /// The synthetic entry's weighted value is the sum of the merged entries,
    /// so the history total is unchanged. `accumulated` is not touched.
    /// Returns how many entries were merged (0 if history is too short).
    pub fn compact(&self, session: &mut LoadSession) -> usize {
        let merge = session.history.len() / 2;
        if merge < 2 {
            return 0;
        }

        let merged_total: f64 = session.history.drain(..merge).map(|s| s.weighted).sum();
        session
            .history
            .push_front(ComplexityScore::aggregate(merged_total, session.capacity));

        debug!(
            session_id = %session.session_id,
            merged = merge,
            merged_total,
            history_len = session.history.len(),
            "compacted session history"
        );
        merge
    }

    fn push_history(&self, session: &mut LoadSession, score: ComplexityScore) {
        session.history.push_back(score);
        while session.history.len() > self.history_limit {
            session.history.pop_front();
        }
    }
}
