//! # taskpool - bounded thread-pool executor
//!
//! A miniature concurrent task-execution framework: submit units of work
//! ("callables"), run them on a bounded set of managed OS threads, get
//! results back through waitable task futures. Admission into the worker
//! set is two-tiered (core threads plus forced overflow threads up to a
//! hard ceiling), backpressure comes from a capacity-bounded FIFO queue,
//! and shutdown drains gracefully.
//!
//! ## Quick Start
//!
//! ```ignore
//! use taskpool::{Callable, Executor, ExecutorConfig};
//!
//! fn main() {
//!     let config = ExecutorConfig::new()
//!         .core_pool_size(2)
//!         .max_pool_size(4)
//!         .queue_capacity(16);
//!     let exec = Executor::new(config).expect("valid config");
//!
//!     // One-shot task
//!     let future = exec.submit(Callable::once(|| 6 * 7));
//!     println!("result = {:?}", future.wait());
//!
//!     // Periodic task, re-run every 100ms on drift-free deadlines
//!     use std::time::Duration;
//!     exec.submit(Callable::periodic(Duration::from_millis(100), || {
//!         println!("tick");
//!         0
//!     }));
//!
//!     // Blocks until every worker has exited
//!     exec.shutdown();
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        User Code                            │
//! │            submit(), TaskFuture::wait(), shutdown()         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Executor                             │
//! │      core tier → queue → overflow tier → saturation         │
//! └─────────────────────────────────────────────────────────────┘
//!               │                             │
//!               ▼                             ▼
//!        ┌─────────────┐             ┌────────────────────┐
//!        │ ThreadPool  │             │  BoundedQueue<T>   │
//!        │ core/max,   │             │ semaphore backend  │
//!        │ drain       │             │ condvar backend    │
//!        │ barrier     │             │ (RingBuffer under) │
//!        └─────────────┘             └────────────────────┘
//!               │
//!               ▼
//!        worker threads ── complete ──► TaskFuture latches
//! ```
//!
//! The queue's two synchronization backends (counting semaphores vs a
//! mutex with two condition variables) are behaviorally identical and
//! selected per executor through [`QueueKind`].

// Re-export core types
pub use taskpool_core::{Callable, ConfigError, RingBuffer, TaskError, TaskFuture, TaskResult};

// Re-export logging macros and helpers
pub use taskpool_core::plog::{
    init as init_logging, set_flush_enabled, set_log_level, LogLevel,
};
pub use taskpool_core::{tp_debug, tp_error, tp_info, tp_trace, tp_warn};

// Re-export env utilities
pub use taskpool_core::{env_get, env_get_bool};

// Re-export runtime types
pub use taskpool_runtime::{
    bounded_queue, BoundedQueue, CondvarQueue, CondvarSemaphore, CountingObserver, Executor,
    ExecutorConfig, ExecutorObserver, KeepAlive, LogObserver, PlatformSemaphore, QueueKind,
    SaturationPolicy, Semaphore, SemaphoreQueue, ThreadPool,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facade_round_trip() {
        let exec = Executor::new(
            ExecutorConfig::new()
                .core_pool_size(1)
                .max_pool_size(2)
                .queue_capacity(4),
        )
        .unwrap();
        let future = exec.submit(Callable::once(|| "done"));
        assert_eq!(future.wait(), Ok("done"));
        exec.shutdown();
        assert_eq!(exec.pool_size(), 0);
    }
}
