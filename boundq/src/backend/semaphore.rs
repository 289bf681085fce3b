//! Counting-semaphore backend: block on full and empty.
//!
//! Three primitives cooperate:
//!
//! - `empty_slots` starts at the capacity and counts free slots.
//! - `filled_slots` starts at zero and counts stored elements.
//! - `queue_lock` is a binary semaphore guarding the state itself.
//!
//! `add` takes an empty slot, then the lock, pushes, drops the lock and
//! posts a filled slot. `get` is the mirror image. A slot is always taken
//! *before* the lock: waiting for a slot while holding the lock would stall
//! the caller that is about to free one.
//!
//! Only the slot wait observes cancellation and timeouts, and it runs with
//! nothing else held. If anything fails after the slot was taken, the
//! [`Permit`] returns it on drop.

use crate::backend::{Backend, BackendKind};
use crate::error::QueueError;
use crate::state::{QueueState, Stats, Value};
use crate::sync::semaphore::{Permit, SemLock, Semaphore};
use crate::trace::{error, trace};
use crate::wait::Wait;

/// Blocking queue backend built on counting semaphores.
#[derive(Debug)]
pub struct SemaphoreBackend {
    empty_slots: Semaphore,
    filled_slots: Semaphore,
    queue_lock: SemLock<QueueState>,
    capacity: usize,
}

impl SemaphoreBackend {
    /// # Errors
    ///
    /// [`QueueError::InvalidCapacity`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, QueueError> {
        let state = QueueState::new(capacity)?;
        Ok(Self {
            empty_slots: Semaphore::new("empty_slots", capacity),
            filled_slots: Semaphore::new("filled_slots", 0),
            queue_lock: SemLock::new("queue_lock", state),
            capacity,
        })
    }

    /// Pushes `value` into the slot held by `slot`.
    fn commit_add(&self, slot: Permit<'_>, value: Value) -> Result<(), QueueError> {
        self.queue_lock.lock()?.push_back(value)?;
        slot.forget();
        self.filled_slots.release()
    }

    /// Pops the element accounted for by `item`.
    fn commit_get(&self, item: Permit<'_>) -> Result<Value, QueueError> {
        let value = self.queue_lock.lock()?.pop_front().ok_or_else(|| {
            error!("filled_slots permit taken but queue is empty");
            QueueError::Primitive("filled_slots out of sync")
        })?;
        item.forget();
        self.empty_slots.release()?;
        Ok(value)
    }
}

impl Backend for SemaphoreBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Semaphore
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn add(&self, value: Value, wait: &Wait) -> Result<(), QueueError> {
        wait.check_cancelled()?;
        self.queue_lock.lock()?.record_add_attempt();

        trace!(value, "semaphore add waiting for empty slot");
        let slot = self.empty_slots.acquire(wait)?;
        self.commit_add(slot, value)
    }

    fn get(&self, wait: &Wait) -> Result<Value, QueueError> {
        wait.check_cancelled()?;
        self.queue_lock.lock()?.record_get_attempt();

        trace!("semaphore get waiting for filled slot");
        let item = self.filled_slots.acquire(wait)?;
        self.commit_get(item)
    }

    fn try_add(&self, value: Value) -> Result<(), QueueError> {
        self.queue_lock.lock()?.record_add_attempt();
        let Some(slot) = self.empty_slots.try_acquire()? else {
            return Err(QueueError::Full);
        };
        self.commit_add(slot, value)
    }

    fn try_get(&self) -> Result<Value, QueueError> {
        self.queue_lock.lock()?.record_get_attempt();
        let Some(item) = self.filled_slots.try_acquire()? else {
            return Err(QueueError::Empty);
        };
        self.commit_get(item)
    }

    fn stats(&self) -> Result<Stats, QueueError> {
        Ok(self.queue_lock.lock()?.stats())
    }
}
