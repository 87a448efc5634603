use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::Notify;
use tracing::debug;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue is closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, QueueError>;

struct State<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Fixed-capacity FIFO shared by one producer and many consumers
///
/// Architecture:
/// - `Mutex<State>` guards the buffer and the `closed` flag
/// - `not_empty` wakes consumers parked in [`pop`](Self::pop)
/// - `not_full` wakes the producer parked in [`push`](Self::push)
/// - [`close`](Self::close) is the producer's "no more tasks" signal; once the
///   buffer drains, `pop` returns `None` instead of waiting
///
/// The buffer never holds more than `capacity` items, which is what throttles
/// the producer when workers fall behind.
pub struct BoundedQueue<T> {
    state: Mutex<State<T>>,
    capacity: usize,
    not_empty: Notify,
    not_full: Notify,
}

impl<T> BoundedQueue<T> {
    /// Create a queue holding at most `capacity` items (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        debug!(capacity, "Creating bounded work queue");

        Self {
            state: Mutex::new(State {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            capacity,
            not_empty: Notify::new(),
            not_full: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        // The critical sections never panic; recover the data regardless
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a task, waiting while the buffer is full.
    ///
    /// Fails with [`QueueError::Closed`] if the queue was closed, including
    /// while this call was waiting for a free slot.
    pub async fn push(&self, item: T) -> Result<()> {
        loop {
            // Register interest before inspecting state so a wake-up between
            // the check and the await is not lost
            let notified = self.not_full.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if state.closed {
                    return Err(QueueError::Closed);
                }
                if state.items.len() < self.capacity {
                    state.items.push_back(item);
                    drop(state);
                    self.not_empty.notify_one();
                    return Ok(());
                }
            }

            notified.await;
        }
    }

    /// Take the oldest task, waiting while the buffer is empty.
    ///
    /// Returns `None` only when the queue is closed and fully drained.
    pub async fn pop(&self) -> Option<T> {
        loop {
            let notified = self.not_empty.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if let Some(item) = state.items.pop_front() {
                    drop(state);
                    self.not_full.notify_one();
                    return Some(item);
                }
                if state.closed {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Non-blocking emptiness check
    pub fn try_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// Signal that no more tasks will be pushed. Idempotent.
    pub fn close(&self) {
        let newly_closed = {
            let mut state = self.lock();
            !std::mem::replace(&mut state.closed, true)
        };

        if newly_closed {
            debug!("Work queue closed by producer");
            self.not_empty.notify_waiters();
            self.not_full.notify_waiters();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Closed and nothing left to hand out
    pub fn is_drained(&self) -> bool {
        let state = self.lock();
        state.closed && state.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.try_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Closes the queue when dropped, so consumers are released on every exit
/// path of the producer, including early returns and panics.
pub struct CloseOnDrop<'a, T>(pub &'a BoundedQueue<T>);

impl<T> Drop for CloseOnDrop<'_, T> {
    fn drop(&mut self) {
        self.0.close();
    }
}
