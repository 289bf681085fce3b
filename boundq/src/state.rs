//! Queue contents and throughput counters.
//!
//! [`QueueState`] holds no synchronization of its own. Every backend keeps
//! it behind its exclusion primitive and is the only code that mutates it.

use std::collections::VecDeque;
use std::fmt;

use serde::Serialize;

use crate::error::QueueError;

/// Element type carried by the queue.
pub type Value = i32;

/// Attempt and completion counters.
///
/// Each counter is bumped exactly once per attempt or completion, always
/// under the owning backend's exclusion, so the values are exact.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Counters {
    pub add_attempts: u64,
    pub get_attempts: u64,
    pub add_completed: u64,
    pub get_completed: u64,
}

/// Bounded FIFO storage plus its counters.
#[derive(Debug)]
pub struct QueueState {
    elements: VecDeque<Value>,
    capacity: usize,
    counters: Counters,
}

impl QueueState {
    /// Creates empty state.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::InvalidCapacity`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, QueueError> {
        if capacity == 0 {
            return Err(QueueError::InvalidCapacity);
        }
        Ok(Self {
            elements: VecDeque::new(),
            capacity,
            counters: Counters::default(),
        })
    }

    /// Appends `value` at the tail and counts the completed add.
    ///
    /// The caller must have checked [`is_full`](Self::is_full); pushing onto a
    /// full queue is reported as [`QueueError::Full`] and changes nothing.
    ///
    /// # Errors
    ///
    /// [`QueueError::Allocation`] if storage for the element cannot be
    /// reserved. The state is unchanged in that case.
    pub fn push_back(&mut self, value: Value) -> Result<(), QueueError> {
        if self.is_full() {
            return Err(QueueError::Full);
        }
        self.elements
            .try_reserve(1)
            .map_err(|_| QueueError::Allocation)?;
        self.elements.push_back(value);
        self.counters.add_completed += 1;
        Ok(())
    }

    /// Removes the head element and counts the completed get.
    pub fn pop_front(&mut self) -> Option<Value> {
        let value = self.elements.pop_front()?;
        self.counters.get_completed += 1;
        Some(value)
    }

    pub fn record_add_attempt(&mut self) {
        self.counters.add_attempts += 1;
    }

    pub fn record_get_attempt(&mut self) {
        self.counters.get_attempts += 1;
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.elements.len() == self.capacity
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    #[must_use]
    pub const fn counters(&self) -> Counters {
        self.counters
    }

    /// Takes a snapshot for reporting.
    #[must_use]
    pub fn stats(&self) -> Stats {
        Stats {
            size: self.size(),
            capacity: self.capacity,
            add_attempts: self.counters.add_attempts,
            get_attempts: self.counters.get_attempts,
            add_completed: self.counters.add_completed,
            get_completed: self.counters.get_completed,
        }
    }
}

/// Point-in-time view of a queue's occupancy and counters.
///
/// Formats as
/// `size=<n>; attempts=(<add>,<get>,<diff>); completed=(<add>,<get>,<diff>)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub size: usize,
    pub capacity: usize,
    pub add_attempts: u64,
    pub get_attempts: u64,
    pub add_completed: u64,
    pub get_completed: u64,
}

impl Stats {
    /// `add_attempts - get_attempts`; negative when consumers are ahead.
    #[must_use]
    pub const fn attempts_diff(&self) -> i64 {
        self.add_attempts as i64 - self.get_attempts as i64
    }

    /// `add_completed - get_completed`; equals `size` under exclusion.
    #[must_use]
    pub const fn completed_diff(&self) -> i64 {
        self.add_completed as i64 - self.get_completed as i64
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "size={}; attempts=({},{},{}); completed=({},{},{})",
            self.size,
            self.add_attempts,
            self.get_attempts,
            self.attempts_diff(),
            self.add_completed,
            self.get_completed,
            self.completed_diff(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(QueueState::new(0), Err(QueueError::InvalidCapacity)));
    }

    #[test]
    fn push_pop_preserves_order() {
        let mut state = QueueState::new(4).unwrap();
        for v in [3, 1, 4] {
            state.push_back(v).unwrap();
        }
        assert_eq!(state.size(), 3);
        assert_eq!(state.pop_front(), Some(3));
        assert_eq!(state.pop_front(), Some(1));
        assert_eq!(state.pop_front(), Some(4));
        assert_eq!(state.pop_front(), None);
        assert!(state.is_empty());
    }

    #[test]
    fn push_on_full_changes_nothing() {
        let mut state = QueueState::new(2).unwrap();
        state.push_back(1).unwrap();
        state.push_back(2).unwrap();
        assert!(state.is_full());

        assert!(matches!(state.push_back(3), Err(QueueError::Full)));
        assert_eq!(state.size(), 2);
        assert_eq!(state.counters().add_completed, 2);
    }

    #[test]
    fn pop_on_empty_is_not_counted() {
        let mut state = QueueState::new(1).unwrap();
        assert_eq!(state.pop_front(), None);
        assert_eq!(state.counters().get_completed, 0);
    }

    #[test]
    fn completed_diff_tracks_size() {
        let mut state = QueueState::new(8).unwrap();
        for v in 0..5 {
            state.record_add_attempt();
            state.push_back(v).unwrap();
        }
        for _ in 0..2 {
            state.record_get_attempt();
            state.pop_front();
        }
        let stats = state.stats();
        assert_eq!(stats.completed_diff(), stats.size as i64);
        assert_eq!(stats.attempts_diff(), 3);
    }

    #[test]
    fn stats_line_format() {
        let mut state = QueueState::new(2).unwrap();
        state.record_add_attempt();
        state.push_back(5).unwrap();
        state.record_add_attempt();
        state.push_back(7).unwrap();
        state.record_get_attempt();
        state.record_get_attempt();
        state.record_get_attempt();
        state.pop_front();

        assert_eq!(
            state.stats().to_string(),
            "size=1; attempts=(2,3,-1); completed=(2,1,1)"
        );
    }
}
