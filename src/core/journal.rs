//! Macrostep journal.
//!
//! Provides a record of the macrosteps an interpreter has taken. Value
//! style callers extend it with [`Journal::record`]; a running interpreter
//! appends in place and may cap how many steps are kept.

use super::state::StateValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Record of a single macrostep.
///
/// # Example
///
/// ```rust
/// use statecraft::core::{StateValue, StepRecord};
/// use chrono::Utc;
///
/// let record = StepRecord {
///     event: "TIMER".to_string(),
///     from: StateValue::Leaf("green".into()),
///     to: StateValue::Leaf("yellow".into()),
///     timestamp: Utc::now(),
///     microsteps: 1,
/// };
/// assert_eq!(record.event, "TIMER");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Type of the event that started the macrostep
    pub event: String,
    /// Configuration before the macrostep
    pub from: StateValue,
    /// Configuration after the macrostep
    pub to: StateValue,
    /// When the macrostep completed
    pub timestamp: DateTime<Utc>,
    /// Number of microsteps the macrostep took
    pub microsteps: usize,
}

/// Ordered journal of macrosteps.
///
/// `record` returns a new journal with the step appended; `push` appends in
/// place. A journal built with [`Journal::with_limit`] keeps only the most
/// recent steps.
///
/// # Example
///
/// ```rust
/// use statecraft::core::{Journal, StateValue, StepRecord};
/// use chrono::Utc;
///
/// let journal = Journal::new();
/// let journal = journal.record(StepRecord {
///     event: "TIMER".to_string(),
///     from: StateValue::Leaf("green".into()),
///     to: StateValue::Leaf("yellow".into()),
///     timestamp: Utc::now(),
///     microsteps: 1,
/// });
///
/// let path = journal.get_path();
/// assert_eq!(path.len(), 2);
/// assert_eq!(path[1], &StateValue::Leaf("yellow".into()));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Journal {
    steps: VecDeque<StepRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    limit: Option<usize>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    /// A journal that drops its oldest step once it holds `limit` steps.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            steps: VecDeque::new(),
            limit: Some(limit),
        }
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Record a macrostep, returning a new journal.
    ///
    /// This does not mutate the existing journal.
    pub fn record(&self, step: StepRecord) -> Self {
        let mut journal = self.clone();
        journal.push(step);
        journal
    }

    /// Append a macrostep in place.
    pub fn push(&mut self, step: StepRecord) {
        if self.limit == Some(0) {
            return;
        }
        if let Some(limit) = self.limit {
            while self.steps.len() >= limit {
                self.steps.pop_front();
            }
        }
        self.steps.push_back(step);
    }

    /// Get the sequence of configurations traversed: the starting value,
    /// then the value after each recorded step.
    pub fn get_path(&self) -> Vec<&StateValue> {
        let mut path = Vec::new();
        if let Some(first) = self.steps.front() {
            path.push(&first.from);
        }
        for step in &self.steps {
            path.push(&step.to);
        }
        path
    }

    /// Time between the first and last recorded step, `None` when empty.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.steps.front(), self.steps.back()) {
            let duration = last.timestamp.signed_duration_since(first.timestamp);
            duration.to_std().ok()
        } else {
            None
        }
    }

    /// Kept steps, oldest first.
    pub fn steps(&self) -> &VecDeque<StepRecord> {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
