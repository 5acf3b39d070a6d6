//! Wire vocabulary between the coordinator and its queue workers.

use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};

/// One unit drawn from the task queue.
///
/// Termination is a variant rather than an out-of-band null: a worker that
/// receives [`WorkItem::Stop`] finishes its loop and exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
pub enum WorkItem {
    /// Evaluate the half-open index range `[start, end)`.
    Segment {
        /// First series index.
        start: u64,
        /// One past the last series index.
        end: u64,
    },
    /// Sentinel: no more work, shut down.
    Stop,
}

/// Messages sent from a queue worker to the coordinator.
///
/// A worker speaks `Hello` once, then alternates `Ready` and `Partial` until
/// its sentinel arrives. The `Ready` request is what gives the shared queue
/// its pull semantics: a busy worker simply does not ask for more.
#[derive(Debug, Clone, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
pub enum WorkerMessage {
    /// Handshake sent once at startup.
    Hello {
        /// Protocol version for compatibility checking.
        protocol_version: u32,
    },
    /// The worker is idle and wants the next [`WorkItem`].
    Ready,
    /// Unscaled partial sum for one completed segment.
    Partial {
        /// The alternating-series sum over the segment.
        value: f64,
    },
    /// The worker could not complete a segment.
    Failure {
        /// Human-readable description.
        message: String,
    },
}
