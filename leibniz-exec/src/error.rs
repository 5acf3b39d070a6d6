//! Error taxonomy for the execution engine.
//!
//! Every backend is all-or-nothing: a worker failure aborts the run at the
//! collection step, and a remote failure aborts with no partial aggregation.

use leibniz_core::PartitionError;
use leibniz_ipc::FrameError;
use thiserror::Error;

/// Errors surfaced while driving a backend.
#[derive(Debug, Error)]
pub enum ExecError {
    /// Partitioning was unsatisfiable (zero workers).
    #[error(transparent)]
    Partition(#[from] PartitionError),

    /// A worker process could not be spawned.
    #[error("failed to spawn worker: {0}")]
    Spawn(#[source] std::io::Error),

    /// A frame could not be read from or written to a worker pipe.
    #[error("ipc failure: {0}")]
    Ipc(#[from] FrameError),

    /// A worker sent something the protocol does not allow at this point.
    #[error("worker protocol error: expected {expected}, got {got}")]
    Protocol {
        /// What the protocol called for.
        expected: String,
        /// What actually arrived.
        got: String,
    },

    /// A queue endpoint disconnected before all partials were collected.
    #[error("queue closed before all partials were collected")]
    QueueClosed,

    /// A worker reported or suffered a failure; the run is aborted.
    #[error("worker failed: {0}")]
    Worker(String),

    /// The remote backend failed; nothing is aggregated.
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// Failures of the remote-shell backend.
///
/// Any of these aborts the whole distributed run immediately: no partial
/// credit, no retry.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The remote shell command could not be launched.
    #[error("failed to launch remote shell for {host}: {source}")]
    Launch {
        /// Host that was being contacted.
        host: String,
        /// Underlying launch failure.
        #[source]
        source: std::io::Error,
    },

    /// The remote worker exited with a non-zero status.
    #[error("remote worker on {host} exited with {status}")]
    ExitStatus {
        /// Host that failed.
        host: String,
        /// The non-zero exit status.
        status: std::process::ExitStatus,
    },

    /// The first output line did not match `π ≈ <float>`.
    #[error("unparsable output from {host}: {line:?}")]
    BadOutput {
        /// Host that produced the output.
        host: String,
        /// The offending first line.
        line: String,
    },
}
