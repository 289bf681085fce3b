//! Background reporter of queue occupancy and throughput.
//!
//! The monitor thread samples [`Stats`] through the backend's own exclusion,
//! hands the snapshot to a [`Reporter`] with the exclusion already released,
//! then parks until the next tick. Shutdown is only observed between
//! samples, so the monitor never exits while holding a queue lock.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use minstant::Instant;

use crate::backend::Backend;
use crate::error::QueueError;
use crate::state::Stats;
use crate::trace::{debug, error, info, warn};

/// Default time between two reports.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Destination of the monitor's periodic stats.
#[derive(Default)]
pub enum Reporter {
    /// Print `queue stats: <line>` to standard output.
    #[default]
    Stdout,
    /// Emit an `info` event through `tracing` (no-op without the feature).
    Log,
    /// Sample but discard.
    Silent,
    /// Hand each snapshot to a callback on the monitor thread.
    Custom(Box<dyn FnMut(&Stats) + Send>),
}

impl Reporter {
    /// Wraps a callback.
    pub fn custom(f: impl FnMut(&Stats) + Send + 'static) -> Self {
        Self::Custom(Box::new(f))
    }

    fn report(&mut self, stats: &Stats) {
        match self {
            Self::Stdout => println!("queue stats: {stats}"),
            Self::Log => {
                info!(target: "boundq::monitor", %stats, "queue stats");
            }
            Self::Silent => {}
            Self::Custom(f) => f(stats),
        }
    }
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdout => f.write_str("Stdout"),
            Self::Log => f.write_str("Log"),
            Self::Silent => f.write_str("Silent"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Handle to a running monitor thread.
///
/// Dropping the handle stops and joins the thread.
#[derive(Debug)]
pub struct Monitor {
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Monitor {
    /// Starts the `boundq-monitor` thread.
    ///
    /// # Errors
    ///
    /// [`QueueError::Init`] if the thread cannot be spawned. The closure,
    /// and with it the thread's reference to `backend`, is dropped in that
    /// case.
    pub fn spawn(
        backend: Arc<dyn Backend>,
        interval: Duration,
        reporter: Reporter,
    ) -> Result<Self, QueueError> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);

        let handle = thread::Builder::new()
            .name("boundq-monitor".into())
            .spawn(move || {
                debug!(interval_ms = interval.as_millis() as u64, "monitor started");
                run(backend.as_ref(), interval, reporter, &flag);
                debug!("monitor exiting");
            })
            .map_err(|e| {
                error!(error = %e, "failed to spawn monitor thread");
                QueueError::Init(e)
            })?;

        Ok(Self {
            shutdown,
            handle: Some(handle),
        })
    }

    /// Requests shutdown and waits for the thread to exit. Idempotent.
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            if handle.join().is_err() {
                error!("monitor thread panicked");
            }
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(backend: &dyn Backend, interval: Duration, mut reporter: Reporter, shutdown: &AtomicBool) {
    while !shutdown.load(Ordering::Acquire) {
        match backend.stats() {
            Ok(stats) => reporter.report(&stats),
            Err(e) => {
                warn!(error = %e, "monitor failed to sample queue");
            }
        }

        let next = Instant::now() + interval;
        loop {
            if shutdown.load(Ordering::Acquire) {
                return;
            }
            let now = Instant::now();
            if now >= next {
                break;
            }
            thread::park_timeout(next - now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    use crate::backend::BackendKind;
    use crate::wait::Wait;

    #[test]
    fn reports_periodically_until_stopped() {
        let backend = BackendKind::CondVar.build(4).unwrap();
        backend.add(1, &Wait::forever()).unwrap();

        let (tx, rx) = mpsc::channel();
        let mut monitor = Monitor::spawn(
            Arc::clone(&backend),
            Duration::from_millis(10),
            Reporter::custom(move |stats| {
                let _ = tx.send(*stats);
            }),
        )
        .unwrap();

        let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(first.size, 1);
        assert_eq!(first.add_completed, 1);
        rx.recv_timeout(Duration::from_secs(2)).unwrap();

        monitor.stop();
        assert!(!monitor.is_running());
        // The sender lives in the reporter, which died with the thread.
        while rx.try_recv().is_ok() {}
        assert!(matches!(
            rx.recv_timeout(Duration::from_millis(50)),
            Err(mpsc::RecvTimeoutError::Disconnected)
        ));
    }

    #[test]
    fn stop_does_not_wait_out_the_interval() {
        let backend = BackendKind::Spin.build(1).unwrap();
        let mut monitor =
            Monitor::spawn(Arc::clone(&backend), Duration::from_secs(3600), Reporter::Silent)
                .unwrap();

        let started = Instant::now();
        monitor.stop();
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn stop_releases_the_backend() {
        let backend = BackendKind::Semaphore.build(1).unwrap();
        let mut monitor =
            Monitor::spawn(Arc::clone(&backend), Duration::from_millis(5), Reporter::Silent)
                .unwrap();
        assert_eq!(Arc::strong_count(&backend), 2);
        monitor.stop();
        assert_eq!(Arc::strong_count(&backend), 1);
    }

    #[test]
    fn reporter_debug_hides_callbacks() {
        assert_eq!(format!("{:?}", Reporter::custom(|_| {})), "Custom(..)");
        assert_eq!(format!("{:?}", Reporter::default()), "Stdout");
    }
}
