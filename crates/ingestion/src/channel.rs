//! Bounded frame channel with an explicit end-of-stream signal
//!
//! Thin wrapper over `async_channel::bounded` driven through its blocking
//! API from OS threads. `send` blocks while the buffer is full (the only
//! backpressure in the pipeline); `receive` blocks while it is empty and
//! the stream has not been stopped.

use async_channel::{bounded, Receiver, Sender};

/// Bounded FIFO handoff with a one-shot terminal stop marker
///
/// Cloning yields another handle to the same channel. Each channel has
/// exactly one logical receiver; fan-out uses one channel per consumer.
#[derive(Debug)]
pub struct Channel<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
    capacity: usize,
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
            capacity: self.capacity,
        }
    }
}

impl<T> Channel<T> {
    /// Create a channel holding at most `capacity` items (minimum 1)
    pub fn bounded(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = bounded(capacity);
        Self { tx, rx, capacity }
    }

    /// Enqueue an item, blocking while the buffer is full
    ///
    /// Returns false without enqueueing if the channel was stopped.
    pub fn send(&self, item: T) -> bool {
        self.tx.send_blocking(item).is_ok()
    }

    /// Dequeue the next item, blocking while empty and not stopped
    ///
    /// Returns `None` only once the channel is stopped and drained.
    pub fn receive(&self) -> Option<T> {
        self.rx.recv_blocking().ok()
    }

    /// Mark end-of-stream; wakes every blocked sender and receiver
    ///
    /// Idempotent. Items already buffered remain receivable.
    pub fn send_stop(&self) {
        self.tx.close();
    }

    /// Whether end-of-stream was signalled
    pub fn is_stopped(&self) -> bool {
        self.tx.is_closed()
    }

    /// Snapshot: no buffered items
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Snapshot: number of buffered items
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Guard that stops the channel when dropped, including during unwinding
    pub fn stop_guard(&self) -> StopGuard<T> {
        StopGuard {
            channel: self.clone(),
        }
    }
}

/// Stops its channel on drop
#[derive(Debug)]
pub struct StopGuard<T> {
    channel: Channel<T>,
}

impl<T> Drop for StopGuard<T> {
    fn drop(&mut self) {
        self.channel.send_stop();
    }
}
