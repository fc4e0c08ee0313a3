//! Semaphore-backed bounded queue
//!
//! Two counting semaphores do the capacity scheduling: `empty_slots`
//! starts at the capacity and meters producers, `full_slots` starts at
//! zero and meters consumers. The mutex exists solely to keep concurrent
//! ring mutations apart - it never serializes producers against consumers,
//! and it is never held across a semaphore wait.

use super::BoundedQueue;
use crate::sema::{new_semaphore, Semaphore};
use std::sync::Mutex;
use std::time::Instant;

use taskpool_core::RingBuffer;

/// Bounded FIFO synchronized by an `empty_slots`/`full_slots` semaphore pair.
pub struct SemaphoreQueue<T> {
    ring: Mutex<RingBuffer<T>>,
    empty_slots: Box<dyn Semaphore>,
    full_slots: Box<dyn Semaphore>,
}

impl<T> SemaphoreQueue<T> {
    /// Create a queue with room for `capacity` items.
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: Mutex::new(RingBuffer::new(capacity)),
            empty_slots: new_semaphore(capacity),
            full_slots: new_semaphore(0),
        }
    }

    /// Insert under the ring mutex. Caller holds an empty-slot permit.
    fn store(&self, item: T) {
        let mut ring = self.ring.lock().unwrap();
        if ring.put(item).is_err() {
            unreachable!("a held empty-slot permit guarantees a free slot");
        }
        drop(ring);
        self.full_slots.release();
    }

    /// Extract under the ring mutex. Caller holds a full-slot permit.
    fn fetch(&self) -> T {
        let mut ring = self.ring.lock().unwrap();
        let item = ring.get().expect("a held full-slot permit guarantees an item");
        drop(ring);
        self.empty_slots.release();
        item
    }
}

impl<T: Send> BoundedQueue<T> for SemaphoreQueue<T> {
    fn get(&self) -> T {
        self.full_slots.acquire();
        self.fetch()
    }

    fn put(&self, item: T) {
        self.empty_slots.acquire();
        self.store(item);
    }

    fn remove(&self) -> Option<T> {
        if !self.full_slots.try_acquire() {
            return None;
        }
        Some(self.fetch())
    }

    fn add(&self, item: T) -> Result<(), T> {
        if !self.empty_slots.try_acquire() {
            return Err(item);
        }
        self.store(item);
        Ok(())
    }

    fn poll(&self, deadline: Instant) -> Option<T> {
        if !self.full_slots.acquire_until(deadline) {
            return None;
        }
        Some(self.fetch())
    }

    fn offer(&self, item: T, deadline: Instant) -> Result<(), T> {
        if !self.empty_slots.acquire_until(deadline) {
            return Err(item);
        }
        self.store(item);
        Ok(())
    }

    fn len(&self) -> usize {
        self.ring.lock().unwrap().len()
    }

    fn capacity(&self) -> usize {
        self.ring.lock().unwrap().capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permits_track_occupancy() {
        let q = SemaphoreQueue::new(3);
        q.put(1u32);
        q.put(2);
        assert_eq!(q.len(), 2);
        assert_eq!(q.empty_slots.permits(), 1);
        assert_eq!(q.full_slots.permits(), 2);

        assert_eq!(q.get(), 1);
        assert_eq!(q.empty_slots.permits(), 2);
        assert_eq!(q.full_slots.permits(), 1);
    }

    #[test]
    fn test_failed_add_leaves_permits_alone() {
        let q = SemaphoreQueue::new(1);
        assert_eq!(q.add(1u32), Ok(()));
        assert_eq!(q.add(2), Err(2));
        assert_eq!(q.empty_slots.permits(), 0);
        assert_eq!(q.full_slots.permits(), 1);
    }
}
