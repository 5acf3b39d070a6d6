//! Backend selection and the single-pass run driver.
//!
//! One run walks `partition → dispatch → collect → reduce` exactly once, no
//! retries. The clock starts before partitioning (each backend partitions
//! for itself) and stops after reduction.

use crate::error::ExecError;
use crate::fanout::run_fanout;
use crate::pool::run_pool;
use crate::queue::{run_process_queue, run_thread_queue};
use crate::remote::{run_remote, RemoteSegmentRunner, SshRunner};
use leibniz_core::{partial_sum, reduce, Segment};
use std::time::{Duration, Instant};

/// The execution strategy for one run.
///
/// Exactly one backend is chosen before the orchestrator is entered; the
/// enum makes an ambiguous or absent selection unrepresentable here. The
/// flag-level check lives in the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// One scoped thread per even-split segment.
    FanOut {
        /// Worker thread count.
        threads: usize,
    },
    /// Producer-consumer threads over in-process queues.
    ThreadQueue {
        /// Consumer thread count.
        threads: usize,
    },
    /// Producer-consumer worker processes over framed pipes.
    ProcessQueue {
        /// Worker process count.
        processes: usize,
    },
    /// Fixed process pool with up-front scatter and one-shot gather.
    Pool {
        /// Pool size.
        size: usize,
    },
    /// One remote host per even-split segment, contacted sequentially.
    Remote {
        /// Host names in contact order.
        hosts: Vec<String>,
    },
    /// Sequential sum over `segments × seg_size` consecutive indices.
    Manual {
        /// Number of segments to evaluate.
        segments: u64,
        /// Indices per segment.
        seg_size: u64,
    },
    /// Single-threaded evaluation of the whole range.
    Sequential,
}

/// Final output of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunResult {
    /// The computed approximation of π.
    pub approximation: f64,
    /// `|π − approximation|`.
    pub error: f64,
    /// Wall-clock duration from partitioning through reduction.
    pub elapsed: Duration,
}

/// Drive one run with the default remote transport (`ssh`, re-invoking this
/// binary on the far side).
pub fn run(backend: &Backend, iterations: u64) -> Result<RunResult, ExecError> {
    timed(|| execute(backend, iterations, None))
}

/// Like [`run`], with an injected remote transport. Tests substitute an
/// in-memory runner; the CLI substitutes a configured program path.
pub fn run_with_remote(
    backend: &Backend,
    iterations: u64,
    remote: &dyn RemoteSegmentRunner,
) -> Result<RunResult, ExecError> {
    timed(|| execute(backend, iterations, Some(remote)))
}

fn timed<F>(dispatch: F) -> Result<RunResult, ExecError>
where
    F: FnOnce() -> Result<f64, ExecError>,
{
    let started = Instant::now();
    let approximation = dispatch()?;
    let elapsed = started.elapsed();
    Ok(RunResult {
        approximation,
        error: (std::f64::consts::PI - approximation).abs(),
        elapsed,
    })
}

fn execute(
    backend: &Backend,
    iterations: u64,
    remote: Option<&dyn RemoteSegmentRunner>,
) -> Result<f64, ExecError> {
    match backend {
        Backend::FanOut { threads } => run_fanout(iterations, *threads),
        Backend::ThreadQueue { threads } => run_thread_queue(iterations, *threads),
        Backend::ProcessQueue { processes } => run_process_queue(iterations, *processes),
        Backend::Pool { size } => run_pool(iterations, *size),
        Backend::Remote { hosts } => match remote {
            Some(runner) => run_remote(runner, hosts, iterations),
            None => {
                let runner = SshRunner::current_exe()?;
                run_remote(&runner, hosts, iterations)
            }
        },
        Backend::Manual { segments, seg_size } => Ok(run_manual(*segments, *seg_size)),
        Backend::Sequential => Ok(reduce([partial_sum(Segment::new(0, iterations))])),
    }
}

/// Manual mode: `segments` consecutive ranges of `seg_size` indices each,
/// evaluated one after another on the calling thread.
fn run_manual(segments: u64, seg_size: u64) -> f64 {
    reduce((0..segments).map(|i| partial_sum(Segment::new(i * seg_size, (i + 1) * seg_size))))
}
