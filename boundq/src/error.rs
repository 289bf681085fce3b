//! Error type shared by every queue backend.

use thiserror::Error;

/// Error returned by queue construction and by `add`/`get`.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The requested capacity was zero.
    #[error("queue capacity must be greater than 0")]
    InvalidCapacity,
    /// The monitor thread could not be started.
    #[error("failed to start monitor thread: {0}")]
    Init(#[source] std::io::Error),
    /// Add on a full queue that does not block.
    #[error("queue is full")]
    Full,
    /// Get on an empty queue that does not block.
    #[error("queue is empty")]
    Empty,
    /// Storage for a new element could not be reserved.
    #[error("failed to allocate storage for a new element")]
    Allocation,
    /// A lock, condition variable or semaphore reported failure.
    #[error("synchronization primitive failed: {0}")]
    Primitive(&'static str),
    /// The wait was cancelled through its [`CancelToken`](crate::CancelToken).
    #[error("operation cancelled")]
    Cancelled,
    /// The wait deadline passed before a slot or element became available.
    #[error("operation timed out")]
    TimedOut,
}

impl QueueError {
    /// Returns `true` if the same call may succeed when simply retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Full | Self::Empty | Self::TimedOut)
    }
}
