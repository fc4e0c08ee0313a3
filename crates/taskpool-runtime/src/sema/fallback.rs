//! Portable counting semaphore on std::sync::Condvar
//!
//! Used on platforms without futex support, and always compiled so the
//! test suite can run both implementations side by side.

use super::Semaphore;
use std::sync::{Condvar, Mutex};
use std::time::Instant;

/// Mutex/condvar-backed counting semaphore
pub struct CondvarSemaphore {
    permits: Mutex<usize>,
    available: Condvar,
}

impl CondvarSemaphore {
    /// Create a semaphore holding `permits` initial permits.
    pub fn new(permits: usize) -> Self {
        Self {
            permits: Mutex::new(permits),
            available: Condvar::new(),
        }
    }
}

impl Semaphore for CondvarSemaphore {
    fn acquire(&self) {
        let mut permits = self.permits.lock().unwrap();
        while *permits == 0 {
            permits = self.available.wait(permits).unwrap();
        }
        *permits -= 1;
    }

    fn try_acquire(&self) -> bool {
        let mut permits = self.permits.lock().unwrap();
        if *permits == 0 {
            return false;
        }
        *permits -= 1;
        true
    }

    fn acquire_until(&self, deadline: Instant) -> bool {
        let mut permits = self.permits.lock().unwrap();
        loop {
            if *permits > 0 {
                *permits -= 1;
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            // Re-arm against the absolute deadline; spurious wakeups and
            // lost races just come back around.
            let (guard, _timeout) = self.available.wait_timeout(permits, deadline - now).unwrap();
            permits = guard;
        }
    }

    fn release(&self) {
        let mut permits = self.permits.lock().unwrap();
        *permits += 1;
        drop(permits);
        self.available.notify_one();
    }

    fn permits(&self) -> usize {
        *self.permits.lock().unwrap()
    }
}
