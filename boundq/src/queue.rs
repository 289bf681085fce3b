//! Public queue handle.
//!
//! A [`Queue`] owns one backend and the monitor thread that reports on it.
//! Both are created together by [`Queue::new`] and torn down together by
//! [`Queue::destroy`] (or on drop): the monitor is stopped and joined first,
//! then the backend and any elements still stored are released.
//!
//! # Example
//!
//! ```
//! use boundq::{BackendKind, Queue, QueueConfig, QueueError, Reporter};
//!
//! let queue = Queue::new(
//!     QueueConfig::new(BackendKind::Spin, 2).with_reporter(Reporter::Silent),
//! )
//! .unwrap();
//!
//! queue.add(5).unwrap();
//! queue.add(7).unwrap();
//! assert!(matches!(queue.add(9), Err(QueueError::Full)));
//! assert_eq!(queue.get().unwrap(), 5);
//! assert_eq!(queue.get().unwrap(), 7);
//!
//! let stats = queue.destroy().unwrap();
//! assert_eq!((stats.add_completed, stats.get_completed, stats.size), (2, 2, 0));
//! ```
//!
//! A destroyed queue cannot be used again:
//!
//! ```compile_fail
//! use boundq::{BackendKind, Queue};
//!
//! let queue = Queue::with_capacity(BackendKind::CondVar, 4).unwrap();
//! let _ = queue.destroy();
//! queue.add(1).unwrap();
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::backend::{Backend, BackendKind};
use crate::error::QueueError;
use crate::monitor::{DEFAULT_INTERVAL, Monitor, Reporter};
use crate::state::{Stats, Value};
use crate::trace::{debug, info};
use crate::wait::Wait;

/// Default capacity used by [`QueueConfig::default`].
pub const DEFAULT_CAPACITY: usize = 1024;

/// Configuration for a [`Queue`].
#[derive(Debug)]
pub struct QueueConfig {
    /// Maximum number of stored elements. Must be non-zero.
    pub capacity: usize,
    /// Synchronization strategy.
    pub backend: BackendKind,
    /// Time between two monitor reports.
    pub monitor_interval: Duration,
    /// Where monitor reports go.
    pub reporter: Reporter,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            backend: BackendKind::default(),
            monitor_interval: DEFAULT_INTERVAL,
            reporter: Reporter::default(),
        }
    }
}

impl QueueConfig {
    #[must_use]
    pub fn new(backend: BackendKind, capacity: usize) -> Self {
        Self {
            capacity,
            backend,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_monitor_interval(mut self, interval: Duration) -> Self {
        self.monitor_interval = interval;
        self
    }

    #[must_use]
    pub fn with_reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = reporter;
        self
    }
}

/// Bounded, thread-safe FIFO queue of [`Value`]s.
///
/// Share it between threads by reference (`std::thread::scope`) or through
/// an `Arc`. Whether [`add`](Self::add) and [`get`](Self::get) block or fail
/// fast depends on the [`BackendKind`] chosen at construction.
#[derive(Debug)]
pub struct Queue {
    backend: Arc<dyn Backend>,
    monitor: Monitor,
}

impl Queue {
    /// Creates the backend and starts the monitor.
    ///
    /// # Errors
    ///
    /// - [`QueueError::InvalidCapacity`] if `config.capacity` is zero.
    /// - [`QueueError::Init`] if the monitor thread cannot be spawned; the
    ///   backend is released before returning.
    pub fn new(config: QueueConfig) -> Result<Self, QueueError> {
        let QueueConfig {
            capacity,
            backend: kind,
            monitor_interval,
            reporter,
        } = config;

        let backend = kind.build(capacity)?;
        let monitor = Monitor::spawn(Arc::clone(&backend), monitor_interval, reporter)?;

        info!(backend = %kind, capacity, "queue created");
        Ok(Self { backend, monitor })
    }

    /// Creates a queue with default monitor settings.
    ///
    /// # Errors
    ///
    /// See [`Queue::new`].
    pub fn with_capacity(kind: BackendKind, capacity: usize) -> Result<Self, QueueError> {
        Self::new(QueueConfig::new(kind, capacity))
    }

    #[must_use]
    pub fn kind(&self) -> BackendKind {
        self.backend.kind()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.backend.capacity()
    }

    /// Appends `value`.
    ///
    /// Blocking backends wait for a free slot; the spin backend fails with
    /// [`QueueError::Full`] instead.
    ///
    /// # Errors
    ///
    /// `Full` (spin only), `Allocation`, or `Primitive`.
    pub fn add(&self, value: Value) -> Result<(), QueueError> {
        self.backend.add(value, &Wait::forever())
    }

    /// Removes the oldest value.
    ///
    /// Blocking backends wait for an element; the spin backend fails with
    /// [`QueueError::Empty`] instead.
    ///
    /// # Errors
    ///
    /// `Empty` (spin only) or `Primitive`.
    pub fn get(&self) -> Result<Value, QueueError> {
        self.backend.get(&Wait::forever())
    }

    /// Like [`add`](Self::add), with the wait bounded by `wait`.
    ///
    /// # Errors
    ///
    /// As [`add`](Self::add), plus `Cancelled` and `TimedOut`.
    pub fn add_with(&self, value: Value, wait: &Wait) -> Result<(), QueueError> {
        self.backend.add(value, wait)
    }

    /// Like [`get`](Self::get), with the wait bounded by `wait`.
    ///
    /// # Errors
    ///
    /// As [`get`](Self::get), plus `Cancelled` and `TimedOut`.
    pub fn get_with(&self, wait: &Wait) -> Result<Value, QueueError> {
        self.backend.get(wait)
    }

    /// Appends `value` only if a slot is free right now, on any backend.
    ///
    /// # Errors
    ///
    /// `Full`, `Allocation`, or `Primitive`.
    pub fn try_add(&self, value: Value) -> Result<(), QueueError> {
        self.backend.try_add(value)
    }

    /// Removes the oldest value only if one is present right now.
    ///
    /// # Errors
    ///
    /// `Empty` or `Primitive`.
    pub fn try_get(&self) -> Result<Value, QueueError> {
        self.backend.try_get()
    }

    /// Snapshot of size and counters, taken under the backend's exclusion.
    ///
    /// # Errors
    ///
    /// `Primitive` if the exclusion cannot be taken.
    pub fn stats(&self) -> Result<Stats, QueueError> {
        self.backend.stats()
    }

    /// Prints the stats line to standard output and returns the snapshot.
    ///
    /// # Errors
    ///
    /// `Primitive` if the exclusion cannot be taken.
    pub fn print_stats(&self) -> Result<Stats, QueueError> {
        let stats = self.stats()?;
        println!("queue stats: {stats}");
        Ok(stats)
    }

    /// Stops the monitor, releases the backend and any remaining elements,
    /// and returns the final counters.
    ///
    /// Teardown always completes. The error only means the final snapshot
    /// could not be taken.
    ///
    /// # Errors
    ///
    /// `Primitive` if the exclusion cannot be taken for the final snapshot.
    pub fn destroy(mut self) -> Result<Stats, QueueError> {
        debug!("stopping monitor");
        self.monitor.stop();
        let stats = self.backend.stats();
        info!(final_stats = ?stats, "queue destroyed");
        stats
    }
}
