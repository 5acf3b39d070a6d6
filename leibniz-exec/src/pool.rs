//! Process-pool backend.
//!
//! A fixed-size pool of worker processes is handed all segments at once and
//! returns all partials together: from the caller's side the scatter/gather
//! is a single blocking call, and the pool has been torn down (every child
//! exited) by the time it returns.

use crate::error::ExecError;
use crate::process::QueueWorkerHandle;
use leibniz_core::{ceiling_chunks, reduce, PartitionError, Segment};
use leibniz_ipc::{FrameError, WorkItem, WorkerMessage};
use rayon::prelude::*;
use tracing::debug;

/// Fixed-size pool of worker processes.
pub struct ProcessPool {
    workers: Vec<QueueWorkerHandle>,
}

impl ProcessPool {
    /// Spawn `size` workers by re-invoking the current executable.
    pub fn spawn(size: usize) -> Result<Self, ExecError> {
        if size == 0 {
            return Err(PartitionError::NoWorkers.into());
        }
        let mut workers = Vec::with_capacity(size);
        for _ in 0..size {
            workers.push(QueueWorkerHandle::spawn()?);
        }
        Ok(Self { workers })
    }

    /// Scatter `segments` across the pool round-robin and gather every
    /// partial.
    ///
    /// Consumes the pool: each worker is driven through its fixed assignment
    /// on a rayon thread and reaped afterwards, so no child outlives the
    /// call on either the success or the failure path.
    pub fn scatter_gather(self, segments: &[Segment]) -> Result<Vec<f64>, ExecError> {
        let size = self.workers.len();
        let mut assignments: Vec<Vec<WorkItem>> = vec![Vec::new(); size];
        for (i, segment) in segments.iter().enumerate() {
            assignments[i % size].push(WorkItem::Segment {
                start: segment.start,
                end: segment.end,
            });
        }
        debug!(segments = segments.len(), size, "pool scatter");

        let drivers = rayon::ThreadPoolBuilder::new()
            .num_threads(size)
            .build()
            .map_err(|e| ExecError::Worker(format!("failed to build driver pool: {e}")))?;

        let outcomes: Vec<Result<Vec<f64>, ExecError>> = drivers.install(|| {
            self.workers
                .into_par_iter()
                .zip(assignments)
                .map(|(worker, items)| run_assignment(worker, items))
                .collect()
        });

        let mut partials = Vec::with_capacity(segments.len());
        for outcome in outcomes {
            partials.extend(outcome?);
        }
        Ok(partials)
    }
}

/// Drive one worker through its preassigned items, then reap it.
///
/// The worker still paces itself with `Ready` requests; only the assignment
/// was fixed at scatter time.
fn run_assignment(
    mut worker: QueueWorkerHandle,
    items: Vec<WorkItem>,
) -> Result<Vec<f64>, ExecError> {
    let expected = items.len();
    let mut pending = items.into_iter();
    let mut partials = Vec::with_capacity(expected);
    let mut stopped = false;

    while !(stopped && partials.len() == expected) {
        match worker.recv_message() {
            Ok(WorkerMessage::Ready) => {
                if let Some(item) = pending.next() {
                    worker.send_item(&item)?;
                } else {
                    worker.send_item(&WorkItem::Stop)?;
                    stopped = true;
                }
            }
            Ok(WorkerMessage::Partial { value }) => partials.push(value),
            Ok(WorkerMessage::Failure { message }) => return Err(ExecError::Worker(message)),
            Ok(WorkerMessage::Hello { .. }) => {
                return Err(ExecError::Protocol {
                    expected: "Ready or Partial".to_string(),
                    got: "Hello".to_string(),
                });
            }
            Err(FrameError::EndOfStream) => {
                return Err(ExecError::Worker(
                    "worker closed its pipe before finishing its assignment".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        }
    }

    worker.join()?;
    Ok(partials)
}

/// Pool backend entry: ceiling-chunk the range, scatter across a fixed
/// pool, gather, reduce.
pub fn run_pool(iterations: u64, pool_size: usize) -> Result<f64, ExecError> {
    let segments = ceiling_chunks(iterations, pool_size)?;
    let pool = ProcessPool::spawn(pool_size)?;
    let partials = pool.scatter_gather(&segments)?;
    Ok(reduce(partials))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sized_pool_is_invalid() {
        assert!(matches!(run_pool(1000, 0), Err(ExecError::Partition(_))));
    }

    #[test]
    #[ignore] // Requires the built leibniz binary; covered by the CLI integration tests.
    fn pool_matches_sequential() {
        use leibniz_core::partial_sum;
        let pooled = run_pool(10_000, 2).unwrap();
        let sequential = reduce([partial_sum(Segment::new(0, 10_000))]);
        assert!((pooled - sequential).abs() < 1e-12);
    }
}
