#![warn(missing_docs)]
//! Leibniz IPC protocol
//!
//! The process-backed executors talk to their workers over an inherited pipe
//! pair. Pipes are byte streams, so messages travel as length-prefixed rkyv
//! frames. The vocabulary is small: a work item going one way, and a
//! handshake, a work request and a partial result coming back.

mod framing;
mod messages;

pub use framing::{read_frame, write_frame, FrameError, FrameReader, FrameWriter, MAX_FRAME_SIZE};
pub use messages::{WorkItem, WorkerMessage};

/// Protocol version advertised in the worker handshake.
pub const PROTOCOL_VERSION: u32 = 1;
