#![deny(unsafe_code)]
#![deny(missing_docs)]

//! # Overview
//!
//! A generic FIFO queue of fixed capacity, shared by every producer/
//! consumer hand-off in the workspace: the listener hands [`Connection`]-ish
//! values to the session worker pool, and session workers hand task
//! references to the file worker pool. Both uses are the same data
//! structure parameterised over `T`; this crate exists so that invariant
//! lives in exactly one place instead of being duplicated per queue.
//!
//! # Design
//!
//! A single [`Mutex`] guards a [`VecDeque`] plus a shutdown flag; two
//! [`Condvar`]s (`not_full`, `not_empty`) wake blocked pushers and poppers.
//! This mirrors the specification's own description of the primitive
//! (§4.1) rather than building it from a channel: the shutdown semantics
//! the specification asks for — pop still drains items that were resident
//! at shutdown time, but returns an error once the queue is empty — are
//! easiest to express with explicit waiter wake-up instead of relying on a
//! channel's disconnect behaviour.
//!
//! # Invariants
//!
//! - At most `capacity` items are ever resident at once.
//! - Items are delivered in FIFO order, exactly once.
//! - [`BoundedQueue::shutdown`] is idempotent and wakes every blocked
//!   pusher and popper.
//! - No item already in the queue at shutdown time is lost: it is still
//!   delivered to the next [`BoundedQueue::pop`] call.
//!
//! # Errors
//!
//! [`BoundedQueue::push`] and [`BoundedQueue::pop`] return
//! [`ShuttingDown`] once the queue has been shut down and, for `pop`, fully
//! drained.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

/// Returned by [`BoundedQueue::push`] and [`BoundedQueue::pop`] once the
/// queue has been shut down (and, for `pop`, drained).
#[derive(Clone, Copy, Debug, thiserror::Error, PartialEq, Eq)]
#[error("queue is shutting down")]
pub struct ShuttingDown;

struct Inner<T> {
    items: VecDeque<T>,
    capacity: usize,
    shutdown: bool,
}

/// A fixed-capacity, thread-safe FIFO queue with shutdown broadcast.
pub struct BoundedQueue<T> {
    inner: Mutex<Inner<T>>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl<T> BoundedQueue<T> {
    /// Creates an empty queue that holds at most `capacity` items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero; a zero-capacity queue can never hold
    /// an item and every `push` would block forever.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "BoundedQueue capacity must be non-zero");
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::with_capacity(capacity),
                capacity,
                shutdown: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    /// Pushes `item` onto the back of the queue, blocking while the queue
    /// is full and not shutting down.
    ///
    /// # Errors
    ///
    /// Returns [`ShuttingDown`] if the queue has already been shut down;
    /// the item is not enqueued.
    pub fn push(&self, item: T) -> Result<(), ShuttingDown> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if inner.shutdown {
                return Err(ShuttingDown);
            }
            if inner.items.len() < inner.capacity {
                break;
            }
            inner = self
                .not_full
                .wait(inner)
                .unwrap_or_else(|e| e.into_inner());
        }
        inner.items.push_back(item);
        drop(inner);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Pops the item at the front of the queue, blocking while the queue
    /// is empty and not shutting down.
    ///
    /// If the queue is shut down but still holds items, those items are
    /// still delivered; only an empty, shut-down queue returns
    /// [`ShuttingDown`].
    ///
    /// # Errors
    ///
    /// Returns [`ShuttingDown`] once the queue is both shut down and
    /// empty.
    pub fn pop(&self) -> Result<T, ShuttingDown> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if let Some(item) = inner.items.pop_front() {
                drop(inner);
                self.not_full.notify_one();
                return Ok(item);
            }
            if inner.shutdown {
                return Err(ShuttingDown);
            }
            inner = self
                .not_empty
                .wait(inner)
                .unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Marks the queue as shutting down and wakes every blocked pusher and
    /// popper. Idempotent.
    pub fn shutdown(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.shutdown = true;
        drop(inner);
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }

    /// Whether [`BoundedQueue::shutdown`] has been called.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).shutdown
    }

    /// Number of items currently resident in the queue.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).items.len()
    }

    /// Whether the queue currently holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The queue's fixed capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).capacity
    }

    /// Attempts to push without blocking; returns `Ok(Err(item))` if the
    /// queue is currently full (and not shutting down), so the caller can
    /// decide to reject rather than wait. Used by the listener, which
    /// never blocks on `accept`.
    ///
    /// # Errors
    ///
    /// Returns `Err(ShuttingDown)` if the queue has already been shut down.
    pub fn try_push(&self, item: T) -> Result<Result<(), T>, ShuttingDown> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.shutdown {
            return Err(ShuttingDown);
        }
        if inner.items.len() >= inner.capacity {
            return Ok(Err(item));
        }
        inner.items.push_back(item);
        drop(inner);
        self.not_empty.notify_one();
        Ok(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn push_then_pop_round_trips_in_fifo_order() {
        let queue = BoundedQueue::new(4);
        queue.push(1).unwrap();
        queue.push(2).unwrap();
        queue.push(3).unwrap();
        assert_eq!(queue.pop().unwrap(), 1);
        assert_eq!(queue.pop().unwrap(), 2);
        assert_eq!(queue.pop().unwrap(), 3);
    }

    #[test]
    fn never_exceeds_capacity() {
        let queue = Arc::new(BoundedQueue::new(2));
        queue.push(1).unwrap();
        queue.push(2).unwrap();
        assert_eq!(queue.try_push(3).unwrap(), Err(3));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn push_blocks_until_space_is_freed() {
        let queue = Arc::new(BoundedQueue::new(1));
        queue.push("a").unwrap();

        let producer_queue = Arc::clone(&queue);
        let handle = thread::spawn(move || {
            producer_queue.push("b").unwrap();
        });

        thread::sleep(Duration::from_millis(50));
        assert_eq!(queue.pop().unwrap(), "a");
        handle.join().unwrap();
        assert_eq!(queue.pop().unwrap(), "b");
    }

    #[test]
    fn pop_blocks_until_an_item_is_available() {
        let queue = Arc::new(BoundedQueue::new(4));
        let consumer_queue = Arc::clone(&queue);
        let handle = thread::spawn(move || consumer_queue.pop().unwrap());

        thread::sleep(Duration::from_millis(50));
        queue.push(42).unwrap();
        assert_eq!(handle.join().unwrap(), 42);
    }

    #[test]
    fn shutdown_drains_resident_items_before_failing() {
        let queue = BoundedQueue::new(4);
        queue.push(1).unwrap();
        queue.push(2).unwrap();
        queue.shutdown();

        assert_eq!(queue.pop().unwrap(), 1);
        assert_eq!(queue.pop().unwrap(), 2);
        assert_eq!(queue.pop(), Err(ShuttingDown));
    }

    #[test]
    fn shutdown_rejects_new_pushes_immediately() {
        let queue = BoundedQueue::new(4);
        queue.shutdown();
        assert_eq!(queue.push(1), Err(ShuttingDown));
    }

    #[test]
    fn shutdown_wakes_a_blocked_pusher_on_a_full_queue() {
        let queue = Arc::new(BoundedQueue::new(1));
        queue.push("only slot").unwrap();

        let blocked_queue = Arc::clone(&queue);
        let handle = thread::spawn(move || blocked_queue.push("never fits"));

        thread::sleep(Duration::from_millis(50));
        queue.shutdown();
        assert_eq!(handle.join().unwrap(), Err(ShuttingDown));
    }

    #[test]
    fn shutdown_wakes_a_blocked_popper_on_an_empty_queue() {
        let queue: Arc<BoundedQueue<i32>> = Arc::new(BoundedQueue::new(4));
        let blocked_queue = Arc::clone(&queue);
        let handle = thread::spawn(move || blocked_queue.pop());

        thread::sleep(Duration::from_millis(50));
        queue.shutdown();
        assert_eq!(handle.join().unwrap(), Err(ShuttingDown));
    }

    #[test]
    fn shutdown_is_idempotent() {
        let queue = BoundedQueue::<i32>::new(2);
        queue.shutdown();
        queue.shutdown();
        assert!(queue.is_shutting_down());
    }
}
