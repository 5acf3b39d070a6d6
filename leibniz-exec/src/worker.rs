//! Queue-worker side of the pipe protocol.
//!
//! A child launched with the hidden worker flag binds to the fd pair named
//! by `LEIBNIZ_IPC_FD`, announces itself, and then asks for work until the
//! sentinel arrives. Without the variable it falls back to stdin/stdout,
//! which makes the loop drivable by hand.

use crate::process::IPC_FD_ENV;
use leibniz_core::{partial_sum, Segment};
use leibniz_ipc::{FrameError, FrameReader, FrameWriter, WorkItem, WorkerMessage, PROTOCOL_VERSION};
use std::io::{Read, Write};
use std::os::unix::io::FromRawFd;
use tracing::warn;

/// IPC endpoints for a worker: the inherited fd pair when launched by the
/// engine, stdin/stdout otherwise.
enum Transport {
    Fds { read_fd: i32, write_fd: i32 },
    Stdio,
}

fn detect_transport() -> Transport {
    if let Ok(val) = std::env::var(IPC_FD_ENV) {
        let parts: Vec<&str> = val.split(',').collect();
        if parts.len() == 2 {
            if let (Ok(read_fd), Ok(write_fd)) = (parts[0].parse(), parts[1].parse()) {
                return Transport::Fds { read_fd, write_fd };
            }
        }
        warn!(value = %val, "invalid {IPC_FD_ENV}, falling back to stdio");
    }
    Transport::Stdio
}

/// Main loop for a queue-worker process.
pub struct QueueWorkerMain {
    reader: FrameReader<Box<dyn Read>>,
    writer: FrameWriter<Box<dyn Write>>,
}

impl QueueWorkerMain {
    /// Bind to the inherited fd pair, or stdin/stdout without one.
    pub fn new() -> Self {
        match detect_transport() {
            Transport::Fds { read_fd, write_fd } => {
                let read = unsafe { std::fs::File::from_raw_fd(read_fd) };
                let write = unsafe { std::fs::File::from_raw_fd(write_fd) };
                Self {
                    reader: FrameReader::new(Box::new(read) as Box<dyn Read>),
                    writer: FrameWriter::new(Box::new(write) as Box<dyn Write>),
                }
            }
            Transport::Stdio => Self {
                reader: FrameReader::new(Box::new(std::io::stdin()) as Box<dyn Read>),
                writer: FrameWriter::new(Box::new(std::io::stdout()) as Box<dyn Write>),
            },
        }
    }

    /// Handshake, then request work until the sentinel: `Ready` → item →
    /// `Partial`.
    pub fn run(&mut self) -> Result<(), FrameError> {
        self.writer.send(&WorkerMessage::Hello {
            protocol_version: PROTOCOL_VERSION,
        })?;

        loop {
            self.writer.send(&WorkerMessage::Ready)?;
            match self.reader.recv::<WorkItem>()? {
                WorkItem::Segment { start, end } => {
                    let value = partial_sum(Segment::new(start, end));
                    self.writer.send(&WorkerMessage::Partial { value })?;
                }
                WorkItem::Stop => return Ok(()),
            }
        }
    }
}

impl Default for QueueWorkerMain {
    fn default() -> Self {
        Self::new()
    }
}
