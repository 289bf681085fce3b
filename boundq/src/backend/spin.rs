//! Spin-lock backend: fail fast on full and empty.
//!
//! Every access to the state goes through a test-and-set spin lock. Nothing
//! here ever sleeps; a caller that sees `Full` or `Empty` is expected to
//! retry on its own schedule.

use crate::backend::{Backend, BackendKind};
use crate::error::QueueError;
use crate::state::{QueueState, Stats, Value};
use crate::trace::trace;
use crate::wait::Wait;

/// Non-blocking queue backend guarded by a spin lock.
#[derive(Debug)]
pub struct SpinBackend {
    state: spin::Mutex<QueueState>,
    capacity: usize,
}

impl SpinBackend {
    /// # Errors
    ///
    /// [`QueueError::InvalidCapacity`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, QueueError> {
        Ok(Self {
            state: spin::Mutex::new(QueueState::new(capacity)?),
            capacity,
        })
    }
}

impl Backend for SpinBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Spin
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn add(&self, value: Value, wait: &Wait) -> Result<(), QueueError> {
        wait.check_cancelled()?;
        self.try_add(value)
    }

    fn get(&self, wait: &Wait) -> Result<Value, QueueError> {
        wait.check_cancelled()?;
        self.try_get()
    }

    fn try_add(&self, value: Value) -> Result<(), QueueError> {
        let mut state = self.state.lock();
        state.record_add_attempt();
        if state.is_full() {
            trace!(value, "spin add rejected: queue full");
            return Err(QueueError::Full);
        }
        state.push_back(value)
    }

    fn try_get(&self) -> Result<Value, QueueError> {
        let mut state = self.state.lock();
        state.record_get_attempt();
        state.pop_front().ok_or(QueueError::Empty)
    }

    fn stats(&self) -> Result<Stats, QueueError> {
        Ok(self.state.lock().stats())
    }
}
