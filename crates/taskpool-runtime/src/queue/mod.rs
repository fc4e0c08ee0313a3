//! Bounded task queue
//!
//! Capacity-bounded FIFO hand-off between any number of producer and
//! consumer threads, with pluggable synchronization backends.
//!
//! # Architecture
//!
//! ```text
//!                  dyn BoundedQueue<T>
//!                          │
//!              ┌───────────┴───────────┐
//!              ▼                       ▼
//!       SemaphoreQueue           CondvarQueue
//!    (empty/full permits       (mutex + not_empty /
//!     + mutex on the ring)      not_full condvars)
//!              │                       │
//!              └───────────┬───────────┘
//!                          ▼
//!                  RingBuffer<T> (unsynchronized)
//! ```
//!
//! Both backends expose byte-identical behavior; the contract tests below
//! run against each through the trait.

mod cond;
mod sem;

pub use cond::CondvarQueue;
pub use sem::SemaphoreQueue;

use std::time::Instant;

/// Bounded FIFO with blocking, non-blocking and deadline-bounded variants
/// of both enqueue and dequeue.
///
/// Deadlines are absolute timestamps, not relative durations, so a wait
/// that retries after a wakeup cannot drift past its budget. Completed
/// enqueues are dequeued in FIFO order; among equally-ready waiters the
/// backend's wait primitive decides who goes first.
pub trait BoundedQueue<T>: Send + Sync {
    /// Block until an item exists; return it.
    fn get(&self) -> T;

    /// Block until a free slot exists; insert `item`.
    fn put(&self, item: T);

    /// Non-blocking `get`; `None` immediately when nothing is ready.
    fn remove(&self) -> Option<T>;

    /// Non-blocking `put`; hands `item` back immediately when full.
    fn add(&self, item: T) -> Result<(), T>;

    /// Bounded-wait `get`; `None` once `deadline` expires.
    fn poll(&self, deadline: Instant) -> Option<T>;

    /// Bounded-wait `put`; hands `item` back once `deadline` expires.
    fn offer(&self, item: T, deadline: Instant) -> Result<(), T>;

    /// Items currently queued (hint under contention).
    fn len(&self) -> usize;

    /// Whether the queue is currently empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fixed capacity this queue was built with.
    fn capacity(&self) -> usize;
}

/// Which synchronization backend a queue should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueKind {
    /// Counting-semaphore pair plus a plain mutex on the ring.
    Semaphore,
    /// One mutex plus `not_empty`/`not_full` condition variables.
    Condvar,
}

impl std::str::FromStr for QueueKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s.to_lowercase().as_str() {
            "sem" | "semaphore" => Ok(QueueKind::Semaphore),
            "cond" | "condvar" => Ok(QueueKind::Condvar),
            _ => Err(()),
        }
    }
}

/// Create a bounded queue with the requested backend.
pub fn bounded_queue<T: Send + 'static>(kind: QueueKind, capacity: usize) -> Box<dyn BoundedQueue<T>> {
    match kind {
        QueueKind::Semaphore => Box::new(SemaphoreQueue::new(capacity)),
        QueueKind::Condvar => Box::new(CondvarQueue::new(capacity)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    const KINDS: [QueueKind; 2] = [QueueKind::Semaphore, QueueKind::Condvar];

    #[test]
    fn test_fifo_order() {
        for kind in KINDS {
            let q = bounded_queue::<u32>(kind, 8);
            for i in 0..8 {
                q.put(i);
            }
            for i in 0..8 {
                assert_eq!(q.get(), i, "{:?}", kind);
            }
        }
    }

    #[test]
    fn test_nonblocking_variants_never_wait() {
        for kind in KINDS {
            let q = bounded_queue::<u32>(kind, 2);
            assert_eq!(q.remove(), None);
            assert_eq!(q.add(1), Ok(()));
            assert_eq!(q.add(2), Ok(()));
            assert_eq!(q.add(3), Err(3), "{:?}", kind);
            assert_eq!(q.len(), 2);
            assert_eq!(q.remove(), Some(1));
            assert_eq!(q.remove(), Some(2));
            assert_eq!(q.remove(), None);
        }
    }

    #[test]
    fn test_poll_expires_at_deadline() {
        for kind in KINDS {
            let q = bounded_queue::<u32>(kind, 2);
            let start = Instant::now();
            assert_eq!(q.poll(start + Duration::from_millis(50)), None);
            let elapsed = start.elapsed();
            assert!(elapsed >= Duration::from_millis(45), "{:?}: {:?}", kind, elapsed);
        }
    }

    #[test]
    fn test_offer_expires_full_and_keeps_nothing() {
        for kind in KINDS {
            let q = bounded_queue::<u32>(kind, 1);
            q.put(1);
            let start = Instant::now();
            assert_eq!(q.offer(2, start + Duration::from_millis(50)), Err(2));
            assert!(start.elapsed() >= Duration::from_millis(45));
            // The expired offer stored nothing
            assert_eq!(q.len(), 1);
            assert_eq!(q.get(), 1);
        }
    }

    #[test]
    fn test_poll_returns_early_when_item_arrives() {
        for kind in KINDS {
            let q: Arc<Box<dyn BoundedQueue<u32>>> = Arc::new(bounded_queue(kind, 2));
            let q2 = Arc::clone(&q);

            let handle = thread::spawn(move || q2.poll(Instant::now() + Duration::from_secs(5)));

            thread::sleep(Duration::from_millis(30));
            q.put(42);
            assert_eq!(handle.join().unwrap(), Some(42), "{:?}", kind);
        }
    }

    #[test]
    fn test_blocked_put_unblocks_on_get() {
        for kind in KINDS {
            let q: Arc<Box<dyn BoundedQueue<u32>>> = Arc::new(bounded_queue(kind, 1));
            q.put(1);
            let q2 = Arc::clone(&q);

            let handle = thread::spawn(move || {
                q2.put(2); // full - must block until the consumer makes room
            });

            thread::sleep(Duration::from_millis(30));
            assert_eq!(q.get(), 1);
            handle.join().unwrap();
            assert_eq!(q.get(), 2);
        }
    }

    #[test]
    fn test_zero_capacity_rejects_everything() {
        for kind in KINDS {
            let q = bounded_queue::<u32>(kind, 0);
            assert_eq!(q.capacity(), 0);
            assert_eq!(q.add(9), Err(9));
            assert_eq!(q.remove(), None);
            assert_eq!(q.offer(9, Instant::now() + Duration::from_millis(10)), Err(9));
            assert_eq!(q.poll(Instant::now() + Duration::from_millis(10)), None);
        }
    }

    #[test]
    fn test_concurrent_producers_consumers_stay_bounded() {
        for kind in KINDS {
            for capacity in [1usize, 3, 16] {
                let q: Arc<Box<dyn BoundedQueue<u64>>> = Arc::new(bounded_queue(kind, capacity));
                const PRODUCERS: usize = 4;
                const CONSUMERS: usize = 3;
                const PER_PRODUCER: usize = 200;

                let mut handles = Vec::new();
                for p in 0..PRODUCERS {
                    let q = Arc::clone(&q);
                    handles.push(thread::spawn(move || {
                        for i in 0..PER_PRODUCER {
                            q.put((p * PER_PRODUCER + i) as u64);
                        }
                    }));
                }

                let mut consumers = Vec::new();
                let total = PRODUCERS * PER_PRODUCER;
                let per_consumer = total / CONSUMERS;
                let remainder = total % CONSUMERS;
                for c in 0..CONSUMERS {
                    let q = Arc::clone(&q);
                    let count = per_consumer + usize::from(c < remainder);
                    consumers.push(thread::spawn(move || {
                        let mut sum = 0u64;
                        for _ in 0..count {
                            sum += q.get();
                        }
                        sum
                    }));
                }

                // Sample the length while the exchange is in flight
                while !handles.iter().all(|h| h.is_finished()) {
                    assert!(q.len() <= capacity, "{:?} cap {}", kind, capacity);
                    thread::yield_now();
                }

                for h in handles {
                    h.join().unwrap();
                }
                let sum: u64 = consumers.into_iter().map(|c| c.join().unwrap()).sum();
                let expected: u64 = (0..total as u64).sum();
                assert_eq!(sum, expected, "{:?} cap {}: item lost or duplicated", kind, capacity);
                assert_eq!(q.len(), 0);
            }
        }
    }
}
