//! Reader/writer ordering harness.
//!
//! One writer adds `0, 1, 2, ...` as fast as it can, one reader checks that
//! every value it gets is the previous one plus one. After the run both
//! threads are cancelled, the queue is destroyed and the final counters are
//! printed. Any ordering error makes the process exit with status 1.
//!
//! # Usage
//!
//! ```sh
//! boundq-harness --backend semaphore --capacity 1000000 --duration 10
//! ```
//!
//! Environment:
//!     RUST_LOG=boundq=debug   (with `--features tracing`)

use std::hint;
use std::thread;
use std::time::Duration;

use boundq::{BackendKind, CancelToken, Queue, QueueConfig, QueueError, Value, Wait};

const DEFAULT_CAPACITY: usize = 1_000_000;
const DEFAULT_DURATION_SECS: u64 = 10;
const DEFAULT_READER_CPU: usize = 0;
const DEFAULT_WRITER_CPU: usize = 1;

#[derive(Debug, thiserror::Error)]
enum HarnessError {
    #[error("{0}")]
    Usage(String),
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),
    #[error("failed to spawn {0} thread: {1}")]
    Spawn(&'static str, std::io::Error),
    #[error("{0} thread panicked")]
    Panicked(&'static str),
    #[error("reader saw {0} out-of-order value(s)")]
    Ordering(u64),
}

struct Args {
    backend: BackendKind,
    capacity: usize,
    duration: Duration,
    reader_cpu: Option<usize>,
    writer_cpu: Option<usize>,
}

struct ReaderReport {
    received: u64,
    errors: u64,
}

fn main() {
    boundq::init_tracing();

    if let Err(e) = run() {
        eprintln!("boundq-harness: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), HarnessError> {
    let argv: Vec<String> = std::env::args().collect();
    let args = parse_args(&argv)?;

    eprintln!(
        "boundq-harness: backend={} capacity={} duration={}s",
        args.backend,
        args.capacity,
        args.duration.as_secs()
    );

    let queue = Queue::new(QueueConfig::new(args.backend, args.capacity))?;
    let stop = CancelToken::new();

    let (report, added) = thread::scope(|s| -> Result<_, HarnessError> {
        let reader_handle = thread::Builder::new()
            .name("reader".into())
            .spawn_scoped(s, || reader(&queue, &stop, args.reader_cpu))
            .map_err(|e| HarnessError::Spawn("reader", e))?;

        thread::yield_now();

        let writer_handle = match thread::Builder::new()
            .name("writer".into())
            .spawn_scoped(s, || writer(&queue, &stop, args.writer_cpu))
        {
            Ok(handle) => handle,
            Err(e) => {
                stop.cancel();
                let _ = reader_handle.join();
                return Err(HarnessError::Spawn("writer", e));
            }
        };

        thread::sleep(args.duration);
        stop.cancel();

        Ok((join("reader", reader_handle)?, join("writer", writer_handle)?))
    })?;

    eprintln!("boundq-harness: reader and writer joined");
    let stats = queue.destroy()?;
    println!("final: {stats}");
    println!(
        "writer added {added}, reader got {} with {} error(s)",
        report.received, report.errors
    );

    if report.errors > 0 {
        return Err(HarnessError::Ordering(report.errors));
    }
    Ok(())
}

fn join<T>(name: &'static str, handle: thread::ScopedJoinHandle<'_, T>) -> Result<T, HarnessError> {
    handle.join().map_err(|_| HarnessError::Panicked(name))
}

fn reader(queue: &Queue, stop: &CancelToken, cpu: Option<usize>) -> ReaderReport {
    pin(cpu);
    let wait = Wait::cancellable(stop.clone());
    let mut expected: Value = 0;
    let mut report = ReaderReport {
        received: 0,
        errors: 0,
    };

    loop {
        match queue.get_with(&wait) {
            Ok(value) => {
                if value != expected {
                    eprintln!("ERROR: got {value} but expected {expected}");
                    report.errors += 1;
                }
                expected = value.wrapping_add(1);
                report.received += 1;
            }
            Err(QueueError::Empty) => hint::spin_loop(),
            Err(QueueError::Cancelled) => break,
            Err(e) => {
                eprintln!("reader: {e}");
                break;
            }
        }
    }
    report
}

fn writer(queue: &Queue, stop: &CancelToken, cpu: Option<usize>) -> u64 {
    pin(cpu);
    let wait = Wait::cancellable(stop.clone());
    let mut next: Value = 0;
    let mut added = 0u64;

    loop {
        match queue.add_with(next, &wait) {
            Ok(()) => {
                next = next.wrapping_add(1);
                added += 1;
            }
            Err(QueueError::Full) => hint::spin_loop(),
            Err(QueueError::Cancelled) => break,
            Err(e) => {
                eprintln!("writer: {e}");
                break;
            }
        }
    }
    added
}

fn pin(cpu: Option<usize>) {
    if let Some(id) = cpu
        && !core_affinity::set_for_current(core_affinity::CoreId { id })
    {
        eprintln!("boundq-harness: could not pin to cpu {id}");
    }
}

fn parse_args(argv: &[String]) -> Result<Args, HarnessError> {
    let mut args = Args {
        backend: BackendKind::default(),
        capacity: DEFAULT_CAPACITY,
        duration: Duration::from_secs(DEFAULT_DURATION_SECS),
        reader_cpu: Some(DEFAULT_READER_CPU),
        writer_cpu: Some(DEFAULT_WRITER_CPU),
    };

    let mut it = argv.iter().skip(1);
    while let Some(arg) = it.next() {
        let mut value = |flag: &str| {
            it.next()
                .cloned()
                .ok_or_else(|| HarnessError::Usage(format!("missing value for {flag}")))
        };
        match arg.as_str() {
            "--backend" | "-b" => {
                args.backend = value(arg)?
                    .parse()
                    .map_err(|e: boundq::UnknownBackend| HarnessError::Usage(e.to_string()))?;
            }
            "--capacity" | "-c" => args.capacity = parse_number(arg, &value(arg)?)?,
            "--duration" | "-d" => {
                args.duration = Duration::from_secs(parse_number(arg, &value(arg)?)?);
            }
            "--reader-cpu" => args.reader_cpu = parse_cpu(arg, &value(arg)?)?,
            "--writer-cpu" => args.writer_cpu = parse_cpu(arg, &value(arg)?)?,
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => return Err(HarnessError::Usage(format!("unknown argument: {other}"))),
        }
    }
    Ok(args)
}

fn parse_number<T: std::str::FromStr>(flag: &str, raw: &str) -> Result<T, HarnessError> {
    raw.parse()
        .map_err(|_| HarnessError::Usage(format!("invalid value for {flag}: {raw}")))
}

/// `none` disables pinning for that thread.
fn parse_cpu(flag: &str, raw: &str) -> Result<Option<usize>, HarnessError> {
    if raw == "none" {
        return Ok(None);
    }
    parse_number(flag, raw).map(Some)
}

fn print_usage() {
    eprintln!(
        r#"boundq-harness - single reader / single writer ordering check

USAGE:
    boundq-harness [OPTIONS]

OPTIONS:
    -b, --backend <KIND>     spin, condvar or semaphore (default: condvar)
    -c, --capacity <N>       Queue capacity (default: 1000000)
    -d, --duration <SECS>    Run time in seconds (default: 10)
        --reader-cpu <CPU>   Pin the reader to CPU, or "none" (default: 0)
        --writer-cpu <CPU>   Pin the writer to CPU, or "none" (default: 1)
    -h, --help               Print this help message
"#
    );
}
