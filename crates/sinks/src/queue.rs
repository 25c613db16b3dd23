//! Bounded FIFO shared by publishers and the delivery loop
//!
//! The capacity check, any eviction and the closed check happen under one
//! lock, so concurrent `push` calls from several pipelines never overshoot
//! the bound and nothing is stored once the queue is closed.

use std::collections::VecDeque;
use std::time::Instant;

use parking_lot::Mutex;
use tally_config::OverflowPolicy;

/// One queued payload
#[derive(Debug, Clone)]
pub struct QueueEntry<T> {
    pub payload: T,
    pub enqueued_at: Instant,
}

/// Result of a successful push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pushed {
    /// Stored without displacing anything
    Queued,
    /// Stored after evicting this many of the oldest entries
    Evicted(usize),
}

/// A refused push, handing the payload back
#[derive(Debug)]
pub enum Refused<T> {
    /// Queue full under drop-and-fail
    Full(T),
    /// Queue closed
    Closed(T),
}

#[derive(Debug)]
struct Slots<T> {
    entries: VecDeque<QueueEntry<T>>,
    closed: bool,
}

/// Bounded FIFO queue
#[derive(Debug)]
pub struct BoundedQueue<T> {
    capacity: usize,
    slots: Mutex<Slots<T>>,
}

impl<T> BoundedQueue<T> {
    /// Create a queue holding at most `capacity` entries (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            slots: Mutex::new(Slots {
                entries: VecDeque::with_capacity(capacity.min(4096)),
                closed: false,
            }),
        }
    }

    /// Append a payload, applying `policy` when the queue is full
    pub fn push(&self, payload: T, policy: OverflowPolicy) -> Result<Pushed, Refused<T>> {
        let mut slots = self.slots.lock();
        if slots.closed {
            return Err(Refused::Closed(payload));
        }
        let entries = &mut slots.entries;
        let mut evicted = 0;
        if entries.len() >= self.capacity {
            match policy {
                OverflowPolicy::DropAndFail => return Err(Refused::Full(payload)),
                OverflowPolicy::DropOldest => {
                    while entries.len() >= self.capacity {
                        entries.pop_front();
                        evicted += 1;
                    }
                }
            }
        }
        entries.push_back(QueueEntry {
            payload,
            enqueued_at: Instant::now(),
        });
        Ok(if evicted == 0 {
            Pushed::Queued
        } else {
            Pushed::Evicted(evicted)
        })
    }

    /// Take the oldest entry; still works after `close`
    pub fn pop(&self) -> Option<QueueEntry<T>> {
        self.slots.lock().entries.pop_front()
    }

    /// Refuse every later push
    pub fn close(&self) {
        self.slots.lock().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.slots.lock().closed
    }

    /// Remove everything, returning how many entries were dropped
    pub fn clear(&self) -> usize {
        let mut slots = self.slots.lock();
        let dropped = slots.entries.len();
        slots.entries.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.slots.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T: Clone> BoundedQueue<T> {
    /// Copy of the queued payloads, oldest first
    pub fn snapshot(&self) -> Vec<T> {
        self.slots.lock().entries.iter().map(|e| e.payload.clone()).collect()
    }
}

#[cfg(test)]
#[path = "queue_test.rs"]
mod tests;
