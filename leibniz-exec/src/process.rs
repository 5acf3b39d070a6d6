//! Worker process plumbing.
//!
//! Queue workers are re-invocations of the current executable with a hidden
//! flag: fd 3 carries work items in, fd 4 carries worker messages out. The
//! coordinator keeps one [`QueueWorkerHandle`] per child and runs one driver
//! thread per handle to bridge the pipe pair into the in-process queues.

use crate::channel::{PartialOutcome, SharedDeque};
use crate::error::ExecError;
use leibniz_ipc::{
    FrameError, FrameReader, FrameWriter, WorkItem, WorkerMessage, PROTOCOL_VERSION,
};
use std::os::unix::io::{FromRawFd, RawFd};
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use tracing::debug;

/// Environment variable naming the worker's inherited read/write fds.
pub const IPC_FD_ENV: &str = "LEIBNIZ_IPC_FD";

/// Hidden flag that switches the binary into queue-worker mode.
pub const QUEUE_WORKER_FLAG: &str = "--queue-worker";

/// Create a pipe pair, returning `(read_fd, write_fd)`.
fn create_pipe() -> Result<(RawFd, RawFd), std::io::Error> {
    let mut fds = [0 as RawFd; 2];
    let ret = unsafe { libc::pipe(fds.as_mut_ptr()) };
    if ret != 0 {
        return Err(std::io::Error::last_os_error());
    }
    // Close-on-exec on both ends; the child ends are re-armed in pre_exec.
    for &fd in &fds {
        unsafe {
            let flags = libc::fcntl(fd, libc::F_GETFD);
            libc::fcntl(fd, libc::F_SETFD, flags | libc::FD_CLOEXEC);
        }
    }
    Ok((fds[0], fds[1]))
}

fn close_fd(fd: RawFd) {
    unsafe {
        libc::close(fd);
    }
}

/// Handle to one spawned queue worker and its pipe pair.
///
/// Owned exclusively by the executor that spawned it; the child is killed on
/// drop if it has not already exited, so failure paths never leak workers.
pub struct QueueWorkerHandle {
    child: Child,
    reader: FrameReader<std::fs::File>,
    writer: FrameWriter<std::fs::File>,
}

impl QueueWorkerHandle {
    /// Spawn a worker by re-invoking the current executable.
    pub fn spawn() -> Result<Self, ExecError> {
        let binary = std::env::current_exe().map_err(ExecError::Spawn)?;
        Self::spawn_binary(&binary)
    }

    /// Spawn a worker from an explicit binary path (tests use this).
    pub fn spawn_binary(binary: &std::path::Path) -> Result<Self, ExecError> {
        // task pipe: coordinator writes, worker reads from fd 3
        let (task_read, task_write) = create_pipe().map_err(ExecError::Spawn)?;
        // reply pipe: worker writes to fd 4, coordinator reads
        let (reply_read, reply_write) = match create_pipe() {
            Ok(fds) => fds,
            Err(e) => {
                close_fd(task_read);
                close_fd(task_write);
                return Err(ExecError::Spawn(e));
            }
        };

        let mut command = Command::new(binary);
        command
            .arg(QUEUE_WORKER_FLAG)
            .env(IPC_FD_ENV, "3,4")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit());

        // In the child: dup task_read→3 and reply_write→4, clear their
        // close-on-exec flags, drop the parent-side ends that leaked in.
        unsafe {
            command.pre_exec(move || {
                if task_read != 3 {
                    libc::dup2(task_read, 3);
                    libc::close(task_read);
                }
                let flags = libc::fcntl(3, libc::F_GETFD);
                libc::fcntl(3, libc::F_SETFD, flags & !libc::FD_CLOEXEC);

                if reply_write != 4 {
                    libc::dup2(reply_write, 4);
                    libc::close(reply_write);
                }
                let flags = libc::fcntl(4, libc::F_GETFD);
                libc::fcntl(4, libc::F_SETFD, flags & !libc::FD_CLOEXEC);

                libc::close(task_write);
                libc::close(reply_read);
                Ok(())
            });
        }

        let child = match command.spawn() {
            Ok(c) => c,
            Err(e) => {
                for fd in [task_read, task_write, reply_read, reply_write] {
                    close_fd(fd);
                }
                return Err(ExecError::Spawn(e));
            }
        };

        // Parent keeps the far ends only.
        close_fd(task_read);
        close_fd(reply_write);

        let writer = FrameWriter::new(unsafe { std::fs::File::from_raw_fd(task_write) });
        let reader = FrameReader::new(unsafe { std::fs::File::from_raw_fd(reply_read) });

        let mut handle = Self {
            child,
            reader,
            writer,
        };
        handle.wait_for_hello()?;
        debug!(pid = handle.child.id(), "queue worker spawned");
        Ok(handle)
    }

    /// Wait for the handshake and validate the protocol version.
    fn wait_for_hello(&mut self) -> Result<(), ExecError> {
        match self.reader.recv::<WorkerMessage>()? {
            WorkerMessage::Hello { protocol_version } if protocol_version == PROTOCOL_VERSION => {
                Ok(())
            }
            WorkerMessage::Hello { protocol_version } => Err(ExecError::Protocol {
                expected: format!("protocol version {PROTOCOL_VERSION}"),
                got: format!("protocol version {protocol_version}"),
            }),
            other => Err(ExecError::Protocol {
                expected: "Hello".to_string(),
                got: format!("{other:?}"),
            }),
        }
    }

    pub(crate) fn recv_message(&mut self) -> Result<WorkerMessage, FrameError> {
        self.reader.recv()
    }

    pub(crate) fn send_item(&mut self, item: &WorkItem) -> Result<(), FrameError> {
        self.writer.send(item)
    }

    /// Block until the child exits, on the success path after it received
    /// its sentinel. A non-zero exit status aborts the run.
    pub fn join(mut self) -> Result<(), ExecError> {
        let status = self.child.wait().map_err(ExecError::Spawn)?;
        if !status.success() {
            return Err(ExecError::Worker(format!("worker exited with {status}")));
        }
        Ok(())
    }

    fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }
}

impl Drop for QueueWorkerHandle {
    fn drop(&mut self) {
        if self.is_alive() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Coordinator-side driver for one worker: answer `Ready` from the shared
/// deque, relay partials into the result queue, stop after handing out a
/// sentinel.
///
/// Runs until the worker is stopped or fails; all abnormal endings are
/// reported through the result queue so the collector aborts the run.
pub(crate) fn drive_worker(
    handle: &mut QueueWorkerHandle,
    tasks: Arc<SharedDeque<WorkItem>>,
    results: crossbeam_channel::Sender<PartialOutcome>,
) {
    loop {
        let message = match handle.recv_message() {
            Ok(message) => message,
            Err(FrameError::EndOfStream) => {
                let _ = results.send(Err("worker closed its pipe unexpectedly".to_string()));
                return;
            }
            Err(e) => {
                let _ = results.send(Err(format!("worker pipe error: {e}")));
                return;
            }
        };

        match message {
            WorkerMessage::Ready => {
                let item = tasks.pop();
                let stop = matches!(item, WorkItem::Stop);
                if let Err(e) = handle.send_item(&item) {
                    let _ = results.send(Err(format!("failed to hand work to worker: {e}")));
                    return;
                }
                if stop {
                    return;
                }
            }
            WorkerMessage::Partial { value } => {
                if results.send(Ok(value)).is_err() {
                    return;
                }
            }
            WorkerMessage::Failure { message } => {
                let _ = results.send(Err(message));
                return;
            }
            WorkerMessage::Hello { .. } => {
                let _ = results.send(Err("unexpected second handshake from worker".to_string()));
                return;
            }
        }
    }
}
