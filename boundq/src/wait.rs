//! Bounds on blocking calls: timeouts and cooperative cancellation.
//!
//! A [`Wait`] is handed to the blocking `add_with`/`get_with` calls. The
//! backends only observe it while they are *not* holding their exclusion
//! primitive, so a cancelled or timed-out caller never leaves a lock behind.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use boundq::{CancelToken, Wait};
//!
//! let token = CancelToken::new();
//! let wait = Wait::forever()
//!     .with_timeout(Duration::from_millis(50))
//!     .with_cancel(token.clone());
//!
//! token.cancel();
//! assert!(wait.is_cancelled());
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use minstant::Instant;

use crate::error::QueueError;

/// Longest a blocked call sleeps before re-checking its cancellation token.
pub const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Timeout specification for blocking operations.
#[derive(Debug, Clone, Copy, Default)]
pub enum Timeout {
    /// Wait indefinitely.
    #[default]
    Infinite,
    /// Wait for at most the specified duration.
    Duration(Duration),
}

impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        Self::Duration(d)
    }
}

/// Shared flag used to cancel blocked queue calls from another thread.
///
/// Clones observe the same flag. Cancellation is sticky.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Blocked calls notice within
    /// [`CANCEL_POLL_INTERVAL`].
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// How long, and under which cancellation token, a blocking call may wait.
#[derive(Debug, Clone, Default)]
pub struct Wait {
    timeout: Timeout,
    cancel: Option<CancelToken>,
}

impl Wait {
    /// Waits indefinitely and cannot be cancelled.
    #[must_use]
    pub fn forever() -> Self {
        Self::default()
    }

    /// Waits at most `timeout`.
    #[must_use]
    pub fn timeout(timeout: Duration) -> Self {
        Self::forever().with_timeout(timeout)
    }

    /// Waits until `token` is cancelled.
    #[must_use]
    pub fn cancellable(token: CancelToken) -> Self {
        Self::forever().with_cancel(token)
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: impl Into<Timeout>) -> Self {
        self.timeout = timeout.into();
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    /// Fails with [`QueueError::Cancelled`] if the token has fired.
    pub(crate) fn check_cancelled(&self) -> Result<(), QueueError> {
        if self.is_cancelled() {
            return Err(QueueError::Cancelled);
        }
        Ok(())
    }

    /// Fixes the deadline relative to now.
    pub(crate) fn start(&self) -> Deadline<'_> {
        let deadline = match self.timeout {
            Timeout::Infinite => None,
            Timeout::Duration(d) => Some(Instant::now() + d),
        };
        Deadline {
            wait: self,
            deadline,
        }
    }
}

/// A [`Wait`] whose clock has started.
pub(crate) struct Deadline<'a> {
    wait: &'a Wait,
    deadline: Option<Instant>,
}

impl Deadline<'_> {
    /// Returns how long the caller may sleep before checking again.
    ///
    /// `Ok(None)` means sleep without a bound: there is neither a deadline
    /// nor a token to poll.
    pub(crate) fn next_slice(&self) -> Result<Option<Duration>, QueueError> {
        self.wait.check_cancelled()?;

        let remaining = match self.deadline {
            None => None,
            Some(dl) => {
                let now = Instant::now();
                if now >= dl {
                    return Err(QueueError::TimedOut);
                }
                Some(dl - now)
            }
        };

        Ok(match (remaining, self.wait.cancel.is_some()) {
            (None, false) => None,
            (None, true) => Some(CANCEL_POLL_INTERVAL),
            (Some(r), false) => Some(r),
            (Some(r), true) => Some(r.min(CANCEL_POLL_INTERVAL)),
        })
    }
}
