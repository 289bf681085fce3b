//! Synchronization backends for the bounded queue.
//!
//! Every backend owns a [`QueueState`](crate::state::QueueState) and decides
//! how access to it is serialized and what happens when the queue is full or
//! empty:
//!
//! | Backend | Exclusion | Full / empty |
//! |---------|-----------|--------------|
//! | [`SpinBackend`] | test-and-set spin lock | fail with `Full` / `Empty` |
//! | [`CondvarBackend`] | mutex + one condition variable | block |
//! | [`SemaphoreBackend`] | slot semaphores + binary semaphore | block |
//!
//! The backend is picked at construction through [`BackendKind`], so callers
//! and tests can be written once against [`Backend`].

pub mod condvar;
pub mod semaphore;
pub mod spin;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use crate::error::QueueError;
use crate::state::{Stats, Value};
use crate::wait::Wait;

pub use condvar::CondvarBackend;
pub use semaphore::SemaphoreBackend;
pub use spin::SpinBackend;

/// Add/get contract shared by all backends.
///
/// Implementations bump the attempt counters under their exclusion exactly
/// once per call, and the completion counters exactly once per success.
pub trait Backend: Send + Sync {
    fn kind(&self) -> BackendKind;

    fn capacity(&self) -> usize;

    /// Appends `value`, waiting for a free slot as bounded by `wait` if the
    /// backend blocks.
    ///
    /// # Errors
    ///
    /// `Full` on non-blocking backends, `Cancelled`/`TimedOut` per `wait`,
    /// `Allocation` or `Primitive` on resource failures.
    fn add(&self, value: Value, wait: &Wait) -> Result<(), QueueError>;

    /// Removes the oldest value, waiting for one as bounded by `wait` if the
    /// backend blocks.
    ///
    /// # Errors
    ///
    /// `Empty` on non-blocking backends, `Cancelled`/`TimedOut` per `wait`,
    /// `Primitive` on resource failures.
    fn get(&self, wait: &Wait) -> Result<Value, QueueError>;

    /// Appends `value` only if a slot is free right now.
    ///
    /// # Errors
    ///
    /// `Full` if there is no free slot, `Allocation`/`Primitive` otherwise.
    fn try_add(&self, value: Value) -> Result<(), QueueError>;

    /// Removes the oldest value only if one is present right now.
    ///
    /// # Errors
    ///
    /// `Empty` if there is nothing to take, `Primitive` otherwise.
    fn try_get(&self) -> Result<Value, QueueError>;

    /// Samples the state under the backend's exclusion.
    ///
    /// # Errors
    ///
    /// `Primitive` if the exclusion cannot be taken.
    fn stats(&self) -> Result<Stats, QueueError>;
}

impl fmt::Debug for dyn Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend")
            .field("kind", &self.kind())
            .field("capacity", &self.capacity())
            .finish_non_exhaustive()
    }
}

/// Selects the synchronization strategy of a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BackendKind {
    /// Busy-wait lock; full/empty fail immediately.
    Spin,
    /// Mutex and condition variable; full/empty block.
    #[default]
    CondVar,
    /// Counting semaphores; full/empty block.
    Semaphore,
}

impl BackendKind {
    pub const ALL: [Self; 3] = [Self::Spin, Self::CondVar, Self::Semaphore];

    /// Whether `add`/`get` wait instead of failing with `Full`/`Empty`.
    #[must_use]
    pub const fn is_blocking(self) -> bool {
        !matches!(self, Self::Spin)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Spin => "spin",
            Self::CondVar => "condvar",
            Self::Semaphore => "semaphore",
        }
    }

    /// Creates a backend of this kind.
    ///
    /// # Errors
    ///
    /// [`QueueError::InvalidCapacity`] if `capacity` is zero.
    pub fn build(self, capacity: usize) -> Result<Arc<dyn Backend>, QueueError> {
        Ok(match self {
            Self::Spin => Arc::new(SpinBackend::new(capacity)?),
            Self::CondVar => Arc::new(CondvarBackend::new(capacity)?),
            Self::Semaphore => Arc::new(SemaphoreBackend::new(capacity)?),
        })
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a [`BackendKind`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown backend {0:?} (expected spin, condvar or semaphore)")]
pub struct UnknownBackend(pub String);

impl FromStr for BackendKind {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "spin" | "spinlock" => Ok(Self::Spin),
            "condvar" | "cond" | "mutex" => Ok(Self::CondVar),
            "semaphore" | "sem" => Ok(Self::Semaphore),
            _ => Err(UnknownBackend(s.to_owned())),
        }
    }
}
