//! Bounded, thread-safe FIFO queue with pluggable synchronization.
//!
//! The same [`Queue`] API is offered on top of three backends:
//!
//! - [`BackendKind::Spin`]: busy-wait lock, `add`/`get` fail fast with
//!   [`QueueError::Full`] / [`QueueError::Empty`].
//! - [`BackendKind::CondVar`]: mutex + condition variable, `add`/`get` block.
//! - [`BackendKind::Semaphore`]: slot-counting semaphores around a binary
//!   semaphore, `add`/`get` block.
//!
//! Every queue runs a monitor thread that reports its [`Stats`] at a fixed
//! interval until the queue is destroyed.
//!
//! # Example
//!
//! ```
//! use std::thread;
//! use boundq::{BackendKind, Queue, QueueConfig, Reporter};
//!
//! let queue = Queue::new(
//!     QueueConfig::new(BackendKind::Semaphore, 4).with_reporter(Reporter::Silent),
//! )
//! .unwrap();
//!
//! thread::scope(|s| {
//!     s.spawn(|| {
//!         for i in 0..100 {
//!             queue.add(i).unwrap();
//!         }
//!     });
//!     for i in 0..100 {
//!         assert_eq!(queue.get().unwrap(), i);
//!     }
//! });
//!
//! let stats = queue.destroy().unwrap();
//! assert_eq!(stats.get_completed, 100);
//! ```

pub mod backend;
pub mod error;
pub mod monitor;
pub mod queue;
pub mod state;
pub mod sync;
pub mod wait;

mod trace;

#[doc(inline)]
pub use backend::{Backend, BackendKind, UnknownBackend};
#[doc(inline)]
pub use error::QueueError;
#[doc(inline)]
pub use monitor::Reporter;
#[doc(inline)]
pub use queue::{Queue, QueueConfig};
#[doc(inline)]
pub use state::{Stats, Value};
#[doc(inline)]
pub use trace::init_tracing;
#[doc(inline)]
pub use wait::{CancelToken, Timeout, Wait};
