//! Mutex + condition variable backend: block on full and empty.
//!
//! One mutex guards the state and one condition variable is broadcast after
//! every completed add or get. Waiters re-check their predicate on every
//! wake, so spurious and unrelated wakeups are harmless.
//!
//! # Lock release on failure
//!
//! The mutex is only ever held through its guard. A wait that fails (the
//! mutex was poisoned by a panicking holder) drops the guard it got back
//! before returning [`QueueError::Primitive`], so a failing caller cannot
//! leave the queue locked for everyone else. The same holds for cancelled
//! and timed-out waits.

use std::sync::{Condvar, Mutex, MutexGuard};

use crate::backend::{Backend, BackendKind};
use crate::error::QueueError;
use crate::state::{QueueState, Stats, Value};
use crate::trace::{error, trace};
use crate::wait::{Deadline, Wait};

/// Blocking queue backend built on a mutex and a condition variable.
#[derive(Debug)]
pub struct CondvarBackend {
    state: Mutex<QueueState>,
    changed: Condvar,
    capacity: usize,
}

impl CondvarBackend {
    /// # Errors
    ///
    /// [`QueueError::InvalidCapacity`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, QueueError> {
        Ok(Self {
            state: Mutex::new(QueueState::new(capacity)?),
            changed: Condvar::new(),
            capacity,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, QueueState>, QueueError> {
        self.state.lock().map_err(|_| {
            error!("queue mutex poisoned");
            QueueError::Primitive("mutex lock")
        })
    }

    /// Sleeps on the condition variable while `blocked` holds.
    ///
    /// On every error path the guard is dropped before returning.
    fn wait_while<'a>(
        &'a self,
        mut state: MutexGuard<'a, QueueState>,
        deadline: &Deadline<'_>,
        blocked: fn(&QueueState) -> bool,
    ) -> Result<MutexGuard<'a, QueueState>, QueueError> {
        while blocked(&*state) {
            state = match deadline.next_slice()? {
                None => self.changed.wait(state).map_err(|_| wait_failed())?,
                Some(slice) => {
                    self.changed
                        .wait_timeout(state, slice)
                        .map_err(|_| wait_failed())?
                        .0
                }
            };
        }
        Ok(state)
    }
}

fn wait_failed() -> QueueError {
    error!("condition variable wait failed; mutex released");
    QueueError::Primitive("condvar wait")
}

impl Backend for CondvarBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::CondVar
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn add(&self, value: Value, wait: &Wait) -> Result<(), QueueError> {
        wait.check_cancelled()?;
        let deadline = wait.start();

        let mut state = self.lock()?;
        state.record_add_attempt();
        if state.is_full() {
            trace!(value, "condvar add waiting for a free slot");
        }
        let mut state = self.wait_while(state, &deadline, QueueState::is_full)?;
        state.push_back(value)?;
        drop(state);

        self.changed.notify_all();
        Ok(())
    }

    fn get(&self, wait: &Wait) -> Result<Value, QueueError> {
        wait.check_cancelled()?;
        let deadline = wait.start();

        let mut state = self.lock()?;
        state.record_get_attempt();
        if state.is_empty() {
            trace!("condvar get waiting for an element");
        }
        let mut state = self.wait_while(state, &deadline, QueueState::is_empty)?;
        let value = state.pop_front().ok_or(QueueError::Empty)?;
        drop(state);

        self.changed.notify_all();
        Ok(value)
    }

    fn try_add(&self, value: Value) -> Result<(), QueueError> {
        let mut state = self.lock()?;
        state.record_add_attempt();
        state.push_back(value)?;
        drop(state);

        self.changed.notify_all();
        Ok(())
    }

    fn try_get(&self) -> Result<Value, QueueError> {
        let mut state = self.lock()?;
        state.record_get_attempt();
        let value = state.pop_front().ok_or(QueueError::Empty)?;
        drop(state);

        self.changed.notify_all();
        Ok(value)
    }

    fn stats(&self) -> Result<Stats, QueueError> {
        Ok(self.lock()?.stats())
    }
}
