#![warn(missing_docs)]
//! Parallel-reduction engine for the Leibniz series.
//!
//! Five interchangeable backends evaluate disjoint segments of the series
//! and reduce the partial sums:
//!
//! - [`run_fanout`]: one scoped thread per even-split segment, single-writer
//!   result slots.
//! - [`run_thread_queue`]: producer-consumer threads over in-process queues.
//! - [`run_process_queue`]: the same queue protocol with isolated worker
//!   processes fed over framed pipes.
//! - [`run_pool`]: a fixed process pool with up-front scatter and one-shot
//!   gather.
//! - [`run_remote`]: one remote host per segment, contacted sequentially
//!   through a swappable [`RemoteSegmentRunner`] transport.
//!
//! [`orchestrator::run`] selects a backend, measures wall-clock time and
//! computes the error against π.

mod channel;
mod error;
mod fanout;
mod orchestrator;
mod pool;
mod process;
mod queue;
mod remote;
mod worker;

pub use channel::{Channel, Disconnected, InProcessChannel};
pub use error::{ExecError, RemoteError};
pub use fanout::run_fanout;
pub use orchestrator::{run, run_with_remote, Backend, RunResult};
pub use pool::{run_pool, ProcessPool};
pub use process::{QueueWorkerHandle, IPC_FD_ENV, QUEUE_WORKER_FLAG};
pub use queue::{run_process_queue, run_thread_queue};
pub use remote::{run_remote, RemoteSegmentRunner, SshRunner, WORKER_OUTPUT_PREFIX};
pub use worker::QueueWorkerMain;
