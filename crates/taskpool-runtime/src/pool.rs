//! Worker-thread pool
//!
//! Tracks how many worker threads are alive and gates the creation of new
//! ones: threads below `core_pool_size` are always granted, the band up to
//! `max_pool_size` only when the caller forces an overflow thread. Workers
//! deregister themselves just before exiting; `wait_empty` is the barrier
//! shutdown uses to see the last one leave.
//!
//! The pool also owns the shutdown flag and the condvar that periodic
//! sleepers park on, so a shutdown interrupts an inter-iteration sleep
//! immediately instead of at the next deadline.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use taskpool_core::tp_error;

struct PoolState {
    /// Live (registered) worker threads.
    size: usize,
    /// Join handles, drained once the pool is empty.
    handles: Vec<JoinHandle<()>>,
}

/// Elastic two-tier worker-count manager.
pub struct ThreadPool {
    core_size: usize,
    max_size: usize,

    state: Mutex<PoolState>,

    /// Signaled when `size` drops to zero.
    empty: Condvar,

    /// Shutdown flag, visible to all workers.
    shutdown: AtomicBool,

    /// Pair for interruptible sleeps between periodic iterations.
    sleep_lock: Mutex<()>,
    sleep_cv: Condvar,

    /// Threads ever spawned, for worker naming.
    spawned_total: AtomicUsize,
}

impl ThreadPool {
    /// Create a pool admitting up to `core_size` ordinary threads and
    /// `max_size` total.
    pub fn new(core_size: usize, max_size: usize) -> Self {
        Self {
            core_size,
            max_size,
            state: Mutex::new(PoolState {
                size: 0,
                handles: Vec::new(),
            }),
            empty: Condvar::new(),
            shutdown: AtomicBool::new(false),
            sleep_lock: Mutex::new(()),
            sleep_cv: Condvar::new(),
            spawned_total: AtomicUsize::new(0),
        }
    }

    /// Spawn a worker running `f` iff the relevant tier has room.
    ///
    /// Without `force` the thread must fit under `core_size`; with it,
    /// under `max_size`. This is the sole admission gate, so the live
    /// count can never exceed `max_size`. Returns whether a thread was
    /// created.
    pub fn spawn<F>(&self, force: bool, f: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.state.lock().unwrap();
        if self.is_shutdown() {
            return false;
        }
        let limit = if force { self.max_size } else { self.core_size };
        if state.size >= limit {
            return false;
        }

        let n = self.spawned_total.fetch_add(1, Ordering::Relaxed);
        let builder = thread::Builder::new().name(format!("taskpool-worker-{}", n));
        match builder.spawn(f) {
            Ok(handle) => {
                state.size += 1;
                state.handles.push(handle);
                true
            }
            Err(e) => {
                tp_error!("failed to spawn worker thread: {}", e);
                false
            }
        }
    }

    /// Deregister the calling worker. Called exactly once, immediately
    /// before the worker's main function returns.
    pub fn detach(&self) {
        let mut state = self.state.lock().unwrap();
        debug_assert!(state.size > 0, "detach without a registered worker");
        state.size -= 1;
        if state.size == 0 {
            self.empty.notify_all();
        }
    }

    /// Live worker count.
    pub fn size(&self) -> usize {
        self.state.lock().unwrap().size
    }

    /// Raise the shutdown flag and wake periodic sleepers.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        // Lock/unlock pairs the flag with the condvar so a sleeper that
        // just checked the flag cannot miss the wakeup.
        drop(self.sleep_lock.lock().unwrap());
        self.sleep_cv.notify_all();
    }

    /// Whether shutdown was requested.
    #[inline]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Sleep until `deadline`, or return early on shutdown.
    ///
    /// Returns `true` when shutdown interrupted the sleep. Used between
    /// periodic task iterations.
    pub fn sleep_until_or_shutdown(&self, deadline: Instant) -> bool {
        let mut guard = self.sleep_lock.lock().unwrap();
        loop {
            if self.is_shutdown() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (g, _timeout) = self.sleep_cv.wait_timeout(guard, deadline - now).unwrap();
            guard = g;
        }
    }

    /// Block until every worker has deregistered, then join their threads
    /// so none is observably alive afterwards.
    pub fn wait_empty(&self) {
        let mut state = self.state.lock().unwrap();
        while state.size > 0 {
            state = self.empty.wait(state).unwrap();
        }
        let handles = std::mem::take(&mut state.handles);
        drop(state);
        for handle in handles {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_two_tier_admission() {
        let pool = Arc::new(ThreadPool::new(1, 2));
        let gate = Arc::new(AtomicBool::new(false));

        let spin = |gate: Arc<AtomicBool>, pool: Arc<ThreadPool>| {
            move || {
                while !gate.load(Ordering::Acquire) {
                    thread::sleep(Duration::from_millis(1));
                }
                pool.detach();
            }
        };

        assert!(pool.spawn(false, spin(gate.clone(), pool.clone())));
        assert!(!pool.spawn(false, spin(gate.clone(), pool.clone())));
        assert!(pool.spawn(true, spin(gate.clone(), pool.clone())));
        assert!(!pool.spawn(true, spin(gate.clone(), pool.clone())));
        assert_eq!(pool.size(), 2);

        gate.store(true, Ordering::Release);
        pool.wait_empty();
        assert_eq!(pool.size(), 0);
    }

    #[test]
    fn test_size_never_exceeds_max_under_contention() {
        let pool = Arc::new(ThreadPool::new(2, 2));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut submitters = Vec::new();
        for _ in 0..100 {
            let pool = Arc::clone(&pool);
            let peak = Arc::clone(&peak);
            submitters.push(thread::spawn(move || {
                let p2 = Arc::clone(&pool);
                pool.spawn(true, move || {
                    thread::sleep(Duration::from_millis(5));
                    p2.detach();
                });
                peak.fetch_max(pool.size(), Ordering::SeqCst);
            }));
        }
        for s in submitters {
            s.join().unwrap();
        }
        pool.wait_empty();
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_wait_empty_blocks_until_last_detach() {
        let pool = Arc::new(ThreadPool::new(2, 2));
        for _ in 0..2 {
            let p = Arc::clone(&pool);
            assert!(pool.spawn(false, move || {
                thread::sleep(Duration::from_millis(40));
                p.detach();
            }));
        }
        let start = Instant::now();
        pool.wait_empty();
        assert!(start.elapsed() >= Duration::from_millis(30));
        assert_eq!(pool.size(), 0);
    }

    #[test]
    fn test_no_spawn_after_shutdown() {
        let pool = ThreadPool::new(2, 4);
        pool.shutdown();
        assert!(!pool.spawn(false, || {}));
        assert!(!pool.spawn(true, || {}));
        assert_eq!(pool.size(), 0);
    }

    #[test]
    fn test_sleep_runs_to_deadline_without_shutdown() {
        let pool = ThreadPool::new(1, 1);
        let start = Instant::now();
        let interrupted = pool.sleep_until_or_shutdown(start + Duration::from_millis(50));
        assert!(!interrupted);
        assert!(start.elapsed() >= Duration::from_millis(45));
    }

    #[test]
    fn test_shutdown_interrupts_sleep() {
        let pool = Arc::new(ThreadPool::new(1, 1));
        let p = Arc::clone(&pool);
        let handle = thread::spawn(move || {
            let start = Instant::now();
            let interrupted = p.sleep_until_or_shutdown(start + Duration::from_secs(10));
            (interrupted, start.elapsed())
        });

        thread::sleep(Duration::from_millis(30));
        pool.shutdown();
        let (interrupted, elapsed) = handle.join().unwrap();
        assert!(interrupted);
        assert!(elapsed < Duration::from_secs(5));
    }
}
