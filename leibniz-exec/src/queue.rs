//! Producer-consumer backends.
//!
//! The orchestration lives in [`drive_queue`], written once against the
//! [`Channel`] capability: enqueue every segment, then one sentinel per
//! worker, then collect exactly one partial per segment. The two backends
//! differ only in where their consumers run: threads sharing the address
//! space, or child processes fed over framed pipes by driver threads.

use crate::channel::{Channel, InProcessChannel, PartialOutcome, SharedDeque};
use crate::error::ExecError;
use crate::process::{drive_worker, QueueWorkerHandle};
use leibniz_core::{ceiling_chunks, partial_sum, reduce, Segment};
use leibniz_ipc::WorkItem;
use std::sync::Arc;
use tracing::debug;

fn work_item(segment: Segment) -> WorkItem {
    WorkItem::Segment {
        start: segment.start,
        end: segment.end,
    }
}

/// Enqueue all segments plus one sentinel per worker, then collect exactly
/// `segments.len()` partials. The result count, not worker termination, is
/// the completion signal.
fn drive_queue(
    segments: &[Segment],
    workers: usize,
    tasks: &dyn Channel<WorkItem>,
    results: &dyn Channel<PartialOutcome>,
) -> Result<Vec<f64>, ExecError> {
    for segment in segments {
        tasks
            .send(work_item(*segment))
            .map_err(|_| ExecError::QueueClosed)?;
    }
    for _ in 0..workers {
        tasks
            .send(WorkItem::Stop)
            .map_err(|_| ExecError::QueueClosed)?;
    }

    let mut partials = Vec::with_capacity(segments.len());
    for _ in 0..segments.len() {
        let outcome = results.recv().map_err(|_| ExecError::QueueClosed)?;
        partials.push(outcome.map_err(ExecError::Worker)?);
    }
    Ok(partials)
}

/// Producer-consumer backend on shared-memory threads.
///
/// Consumers pull until their sentinel and are deliberately left detached:
/// once the expected number of partials has been collected the run is
/// complete, and the drained threads exit on their own.
pub fn run_thread_queue(iterations: u64, workers: usize) -> Result<f64, ExecError> {
    let segments = ceiling_chunks(iterations, workers)?;
    debug!(segments = segments.len(), workers, "thread queue dispatch");

    let tasks = InProcessChannel::unbounded();
    let results = InProcessChannel::unbounded();

    for _ in 0..workers {
        let task_rx = tasks.receiver();
        let result_tx = results.sender();
        std::thread::spawn(move || {
            while let Ok(item) = task_rx.recv() {
                match item {
                    WorkItem::Segment { start, end } => {
                        let value = partial_sum(Segment::new(start, end));
                        if result_tx.send(Ok(value)).is_err() {
                            break;
                        }
                    }
                    WorkItem::Stop => break,
                }
            }
        });
    }

    let partials = drive_queue(&segments, workers, &tasks, &results)?;
    Ok(reduce(partials))
}

/// Task-side [`Channel`] for the process backend: sends land in a shared
/// deque that the per-worker pipe drivers pull from on demand.
struct ProcessTaskChannel {
    deque: Arc<SharedDeque<WorkItem>>,
}

impl ProcessTaskChannel {
    fn new() -> Self {
        Self {
            deque: Arc::new(SharedDeque::new()),
        }
    }

    fn queue(&self) -> Arc<SharedDeque<WorkItem>> {
        Arc::clone(&self.deque)
    }
}

impl Channel<WorkItem> for ProcessTaskChannel {
    fn send(&self, item: WorkItem) -> Result<(), crate::channel::Disconnected> {
        self.deque.push(item);
        Ok(())
    }

    fn recv(&self) -> Result<WorkItem, crate::channel::Disconnected> {
        Ok(self.deque.pop())
    }
}

/// Producer-consumer backend on isolated worker processes.
///
/// Identical protocol to [`run_thread_queue`], but consumers are child
/// processes with no shared memory: all coordination goes through framed
/// pipes. In addition to collecting every partial, every child is reaped
/// before this returns; both conditions must hold for a valid result.
pub fn run_process_queue(iterations: u64, workers: usize) -> Result<f64, ExecError> {
    let segments = ceiling_chunks(iterations, workers)?;
    debug!(segments = segments.len(), workers, "process queue dispatch");

    let mut handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        handles.push(QueueWorkerHandle::spawn()?);
    }

    let tasks = ProcessTaskChannel::new();
    let results = InProcessChannel::unbounded();

    let partials = std::thread::scope(|scope| {
        for handle in handles.iter_mut() {
            let deque = tasks.queue();
            let result_tx = results.sender();
            scope.spawn(move || drive_worker(handle, deque, result_tx));
        }
        drive_queue(&segments, workers, &tasks, &results)
    })?;

    // Every partial is in and every driver has handed out its sentinel;
    // reap the children.
    for handle in handles {
        handle.join()?;
    }

    Ok(reduce(partials))
}
