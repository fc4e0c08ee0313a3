//! Condvar-backed bounded queue
//!
//! One mutex owns the ring; `not_empty` and `not_full` carry the wakeups.
//! Every waiter rechecks its predicate in a loop (spurious and stolen
//! wakeups both land back in the wait), and state changes broadcast with
//! `notify_all` - more than one waiter per side may need to recheck.

use super::BoundedQueue;
use std::sync::{Condvar, Mutex};
use std::time::Instant;

use taskpool_core::RingBuffer;

/// Bounded FIFO synchronized by a mutex and two condition variables.
pub struct CondvarQueue<T> {
    ring: Mutex<RingBuffer<T>>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl<T> CondvarQueue<T> {
    /// Create a queue with room for `capacity` items.
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: Mutex::new(RingBuffer::new(capacity)),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }
}

impl<T: Send> BoundedQueue<T> for CondvarQueue<T> {
    fn get(&self) -> T {
        let mut ring = self.ring.lock().unwrap();
        loop {
            if let Some(item) = ring.get() {
                drop(ring);
                self.not_full.notify_all();
                return item;
            }
            ring = self.not_empty.wait(ring).unwrap();
        }
    }

    fn put(&self, item: T) {
        let mut ring = self.ring.lock().unwrap();
        while ring.is_full() {
            ring = self.not_full.wait(ring).unwrap();
        }
        if ring.put(item).is_err() {
            unreachable!("not_full predicate held under the lock");
        }
        drop(ring);
        self.not_empty.notify_all();
    }

    fn remove(&self) -> Option<T> {
        let mut ring = self.ring.lock().unwrap();
        let item = ring.get();
        drop(ring);
        if item.is_some() {
            self.not_full.notify_all();
        }
        item
    }

    fn add(&self, item: T) -> Result<(), T> {
        let mut ring = self.ring.lock().unwrap();
        match ring.put(item) {
            Ok(()) => {
                drop(ring);
                self.not_empty.notify_all();
                Ok(())
            }
            Err(item) => Err(item),
        }
    }

    fn poll(&self, deadline: Instant) -> Option<T> {
        let mut ring = self.ring.lock().unwrap();
        loop {
            if let Some(item) = ring.get() {
                drop(ring);
                self.not_full.notify_all();
                return Some(item);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let (guard, _timeout) = self.not_empty.wait_timeout(ring, deadline - now).unwrap();
            ring = guard;
        }
    }

    fn offer(&self, item: T, deadline: Instant) -> Result<(), T> {
        let mut ring = self.ring.lock().unwrap();
        loop {
            if !ring.is_full() {
                if ring.put(item).is_err() {
                    unreachable!("not_full predicate held under the lock");
                }
                drop(ring);
                self.not_empty.notify_all();
                return Ok(());
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(item);
            }
            let (guard, _timeout) = self.not_full.wait_timeout(ring, deadline - now).unwrap();
            ring = guard;
        }
    }

    fn len(&self) -> usize {
        self.ring.lock().unwrap().len()
    }

    fn capacity(&self) -> usize {
        self.ring.lock().unwrap().capacity()
    }
}
