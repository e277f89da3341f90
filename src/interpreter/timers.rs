//! Delayed events on a virtual clock.

use crate::core::{Event, NodeId};
use std::time::Duration;

#[derive(Clone, Debug)]
struct Timer {
    due: Duration,
    seq: u64,
    owner: NodeId,
    event: Event,
}

/// Pending delayed events, fired in due-time order. Timers due at the
/// same instant fire in scheduling order.
#[derive(Clone, Debug, Default)]
pub(crate) struct Timers {
    now: Duration,
    next_seq: u64,
    pending: Vec<Timer>,
}

impl Timers {
    pub(crate) fn now(&self) -> Duration {
        self.now
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn schedule(&mut self, owner: NodeId, event: Event, delay: Duration) {
        self.pending.push(Timer {
            due: self.now + delay,
            seq: self.next_seq,
            owner,
            event,
        });
        self.next_seq += 1;
    }

    pub(crate) fn cancel(&mut self, owner: NodeId) -> usize {
        let before = self.pending.len();
        self.pending.retain(|timer| timer.owner != owner);
        before - self.pending.len()
    }

    pub(crate) fn clear(&mut self) -> usize {
        let cancelled = self.pending.len();
        self.pending.clear();
        cancelled
    }

    /// Remove the earliest timer due no later than `until` and move the
    /// clock to its due time.
    pub(crate) fn pop_due(&mut self, until: Duration) -> Option<Event> {
        let (index, _) = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.due <= until)
            .min_by_key(|(_, timer)| (timer.due, timer.seq))?;
        let timer = self.pending.remove(index);
        self.now = self.now.max(timer.due);
        Some(timer.event)
    }

    pub(crate) fn advance_to(&mut self, until: Duration) {
        self.now = self.now.max(until);
    }
}
