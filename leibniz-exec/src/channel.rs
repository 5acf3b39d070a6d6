//! Blocking channel capability shared by the producer-consumer backends.
//!
//! The queue orchestration in [`crate::queue`] is written once against
//! [`Channel`]. The thread backend instantiates it with crossbeam MPMC
//! channels; the process backend backs the task side with a [`SharedDeque`]
//! that per-worker pipe drivers pull from.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, PoisonError};
use thiserror::Error;

/// The other side of the queue has gone away.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("queue endpoint disconnected")]
pub struct Disconnected;

/// Outcome of one segment evaluation as reported through a result queue.
pub(crate) type PartialOutcome = Result<f64, String>;

/// Blocking send/receive over an unbounded FIFO queue.
///
/// Items are received in the order they were sent on the same channel;
/// ordering across distinct channels is not promised.
pub trait Channel<T>: Send + Sync {
    /// Enqueue an item. Never blocks on capacity.
    fn send(&self, item: T) -> Result<(), Disconnected>;

    /// Dequeue the next item, blocking until one is available.
    fn recv(&self) -> Result<T, Disconnected>;
}

/// Shared-memory channel used by the thread backend.
pub struct InProcessChannel<T> {
    tx: crossbeam_channel::Sender<T>,
    rx: crossbeam_channel::Receiver<T>,
}

impl<T> InProcessChannel<T> {
    /// Create an unbounded in-process channel.
    pub fn unbounded() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }

    /// Clone of the sending half, for handing to workers.
    pub fn sender(&self) -> crossbeam_channel::Sender<T> {
        self.tx.clone()
    }

    /// Clone of the receiving half, for handing to workers.
    pub fn receiver(&self) -> crossbeam_channel::Receiver<T> {
        self.rx.clone()
    }
}

impl<T: Send> Channel<T> for InProcessChannel<T> {
    fn send(&self, item: T) -> Result<(), Disconnected> {
        self.tx.send(item).map_err(|_| Disconnected)
    }

    fn recv(&self) -> Result<T, Disconnected> {
        self.rx.recv().map_err(|_| Disconnected)
    }
}

/// Unbounded FIFO with a blocking pop, shared between the enqueuing
/// orchestrator and the per-worker pipe drivers.
pub(crate) struct SharedDeque<T> {
    items: Mutex<VecDeque<T>>,
    ready: Condvar,
}

impl<T> SharedDeque<T> {
    pub(crate) fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            ready: Condvar::new(),
        }
    }

    pub(crate) fn push(&self, item: T) {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.push_back(item);
        self.ready.notify_one();
    }

    pub(crate) fn pop(&self) -> T {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(item) = items.pop_front() {
                return item;
            }
            items = self
                .ready
                .wait(items)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn in_process_channel_is_fifo() {
        let channel = InProcessChannel::unbounded();
        channel.send(1).unwrap();
        channel.send(2).unwrap();
        channel.send(3).unwrap();
        assert_eq!(channel.recv().unwrap(), 1);
        assert_eq!(channel.recv().unwrap(), 2);
        assert_eq!(channel.recv().unwrap(), 3);
    }

    #[test]
    fn shared_deque_pop_blocks_until_push() {
        let deque = Arc::new(SharedDeque::new());
        let popper = {
            let deque = Arc::clone(&deque);
            thread::spawn(move || deque.pop())
        };
        // The popper parks until this push arrives.
        thread::sleep(std::time::Duration::from_millis(20));
        deque.push(7u32);
        assert_eq!(popper.join().unwrap(), 7);
    }

    #[test]
    fn shared_deque_is_fifo() {
        let deque = SharedDeque::new();
        for i in 0..100u32 {
            deque.push(i);
        }
        let popped: Vec<u32> = (0..100).map(|_| deque.pop()).collect();
        assert_eq!(popped, (0..100).collect::<Vec<_>>());
    }
}
