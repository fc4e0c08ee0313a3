//! Linux futex-based counting semaphore
//!
//! Permit count lives in an `AtomicU32`; acquirers CAS it down and sleep
//! on the futex word only when it reads zero. Releases bump the count and
//! issue a `FUTEX_WAKE` only when someone is registered as waiting.
//!
//! A woken acquirer may still lose the permit race to a concurrent
//! `try_acquire`; the outer loop simply re-arms, and `FUTEX_WAIT` returns
//! immediately with `EAGAIN` whenever the count is no longer zero, so no
//! wakeup can be lost.

use super::Semaphore;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Futex-backed counting semaphore
pub struct FutexSemaphore {
    /// Available permits; doubles as the futex word.
    count: AtomicU32,

    /// Threads currently parked (or about to park) in FUTEX_WAIT.
    waiters: AtomicUsize,
}

impl FutexSemaphore {
    /// Create a semaphore holding `permits` initial permits.
    pub fn new(permits: usize) -> Self {
        Self {
            count: AtomicU32::new(u32::try_from(permits).expect("permit count fits in u32")),
            waiters: AtomicUsize::new(0),
        }
    }

    /// CAS loop taking one permit; fails when the count is zero.
    fn try_take(&self) -> bool {
        let mut current = self.count.load(Ordering::Acquire);
        while current > 0 {
            match self.count.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
        false
    }

    /// FUTEX_WAIT while the count reads zero, up to `timeout`.
    fn futex_wait(&self, timeout: Option<Duration>) {
        let timespec = timeout.map(|d| libc::timespec {
            tv_sec: d.as_secs() as i64,
            tv_nsec: d.subsec_nanos() as i64,
        });

        let timespec_ptr = match &timespec {
            Some(ts) => ts as *const libc::timespec,
            None => std::ptr::null(),
        };

        // Sleeps only if the word still reads 0; EAGAIN/ETIMEDOUT/EINTR
        // all funnel back into the caller's retry loop.
        unsafe {
            libc::syscall(
                libc::SYS_futex,
                self.count.as_ptr(),
                libc::FUTEX_WAIT | libc::FUTEX_PRIVATE_FLAG,
                0u32,
                timespec_ptr,
                std::ptr::null::<u32>(),
                0u32,
            );
        }
    }

    fn futex_wake(&self, n: i32) {
        unsafe {
            libc::syscall(
                libc::SYS_futex,
                self.count.as_ptr(),
                libc::FUTEX_WAKE | libc::FUTEX_PRIVATE_FLAG,
                n,
                std::ptr::null::<libc::timespec>(),
                std::ptr::null::<u32>(),
                0u32,
            );
        }
    }
}

impl Semaphore for FutexSemaphore {
    fn acquire(&self) {
        loop {
            if self.try_take() {
                return;
            }
            self.waiters.fetch_add(1, Ordering::SeqCst);
            if self.count.load(Ordering::Acquire) == 0 {
                self.futex_wait(None);
            }
            self.waiters.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn try_acquire(&self) -> bool {
        self.try_take()
    }

    fn acquire_until(&self, deadline: Instant) -> bool {
        loop {
            if self.try_take() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            self.waiters.fetch_add(1, Ordering::SeqCst);
            if self.count.load(Ordering::Acquire) == 0 {
                self.futex_wait(Some(deadline - now));
            }
            self.waiters.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn release(&self) {
        self.count.fetch_add(1, Ordering::Release);
        if self.waiters.load(Ordering::SeqCst) > 0 {
            self.futex_wake(1);
        }
    }

    fn permits(&self) -> usize {
        self.count.load(Ordering::Relaxed) as usize
    }
}
