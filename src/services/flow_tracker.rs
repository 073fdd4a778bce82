//! Flow-state tracking.
//!
//! Smooths the mean of independent normalized factor streams with an
//! exponentially weighted moving average and bands the result. This is an
//! observability signal only; admission never reads it.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, VecDeque};
use tracing::warn;

use crate::domain::errors::{GovernorError, GovernorResult};
use crate::domain::models::{FlowClassification, FlowConfig, FlowSnapshot};

/// EWMA tracker over factor readings.
#[derive(Debug, Clone)]
pub struct FlowStateTracker {
    alpha: f64,
    history_limit: usize,
    history: VecDeque<FlowSnapshot>,
}

impl Default for FlowStateTracker {
    fn default() -> Self {
        Self::from_config(&FlowConfig::default())
    }
}

impl FlowStateTracker {
    /// `alpha` is the weight of the newest reading, clamped into `(0, 1]`.
    pub fn new(alpha: f64, history_limit: usize) -> Self {
        let alpha = if alpha.is_finite() && alpha > 0.0 {
            alpha.min(1.0)
        } else {
            FlowConfig::default().alpha
        };
        Self {
            alpha,
            history_limit: history_limit.max(1),
            history: VecDeque::new(),
        }
    }

    pub fn from_config(config: &FlowConfig) -> Self {
        Self::new(config.alpha, config.history_limit)
    }

    /// Fold a reading in at the current wall-clock time.
    pub fn update(&mut self, factors: &BTreeMap<String, f64>) -> GovernorResult<FlowSnapshot> {
        self.update_at(factors, Utc::now())
    }

    /// Fold a reading in at `timestamp`.
    ///
    /// Factor values are clamped into `[0, 1]`; non-finite values are
    /// dropped. The first reading seeds the level directly.
    pub fn update_at(
        &mut self,
        factors: &BTreeMap<String, f64>,
        timestamp: DateTime<Utc>,
    ) -> GovernorResult<FlowSnapshot> {
        let factors = normalize(factors);
        if factors.is_empty() {
            return Err(GovernorError::EmptyFlowReading);
        }

        let mean = factors.values().sum::<f64>() / factors.len() as f64;
        let smoothed_level = match self.history.back() {
            Some(prev) => self.alpha.mul_add(mean, (1.0 - self.alpha) * prev.smoothed_level),
            None => mean,
        }
        .clamp(0.0, 1.0);

        let snapshot = FlowSnapshot {
            factors,
            smoothed_level,
            classified_as: FlowClassification::classify(smoothed_level),
            timestamp,
        };

        self.history.push_back(snapshot.clone());
        while self.history.len() > self.history_limit {
            self.history.pop_front();
        }
        Ok(snapshot)
    }

    /// Latest snapshot, if any reading has been folded in.
    pub fn current(&self) -> Option<&FlowSnapshot> {
        self.history.back()
    }

    pub fn classification(&self) -> Option<FlowClassification> {
        self.current().map(|s| s.classified_as)
    }

    /// Retained snapshots, oldest first.
    pub const fn history(&self) -> &VecDeque<FlowSnapshot> {
        &self.history
    }
}

fn normalize(factors: &BTreeMap<String, f64>) -> BTreeMap<String, f64> {
    let mut out = BTreeMap::new();
    for (name, value) in factors {
        if !value.is_finite() {
            warn!(factor = %name, "dropping non-finite flow factor");
            continue;
        }
        if !(0.0..=1.0).contains(value) {
            warn!(factor = %name, value, "clamping flow factor into [0, 1]");
        }
        out.insert(name.clone(), value.clamp(0.0, 1.0));
    }
    out
}
