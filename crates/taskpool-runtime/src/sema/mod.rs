//! Counting semaphores
//!
//! The semaphore-backed task queue needs a counting semaphore with a
//! bounded (absolute-deadline) wait. Platform-specific implementations use
//! the most efficient primitive available: a raw futex on Linux, a
//! mutex/condvar pair elsewhere. Both behave identically; the portable one
//! is always compiled so both can be exercised in tests.

use std::time::Instant;

/// Counting semaphore with non-blocking and deadline-bounded acquires.
///
/// Deadlines are absolute timestamps: a wait that gets woken and loses the
/// race to a permit re-arms against the same deadline, so retries never
/// extend the total wait.
pub trait Semaphore: Send + Sync {
    /// Block until a permit is available, then take it.
    fn acquire(&self);

    /// Take a permit iff one is available right now.
    fn try_acquire(&self) -> bool;

    /// Block until a permit is available or `deadline` passes.
    ///
    /// Returns `true` if a permit was taken. On `false` the semaphore is
    /// untouched.
    fn acquire_until(&self, deadline: Instant) -> bool;

    /// Return one permit and wake a waiter if any.
    fn release(&self);

    /// Currently available permits (hint, may be stale under contention).
    fn permits(&self) -> usize;
}

mod fallback;
pub use fallback::CondvarSemaphore;

cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        mod futex_linux;
        pub use futex_linux::FutexSemaphore;
        pub use futex_linux::FutexSemaphore as PlatformSemaphore;
    } else {
        pub use fallback::CondvarSemaphore as PlatformSemaphore;
    }
}

/// Create the platform-default semaphore with `permits` initial permits.
pub fn new_semaphore(permits: usize) -> Box<dyn Semaphore> {
    Box::new(PlatformSemaphore::new(permits))
}
