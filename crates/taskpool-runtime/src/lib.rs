//! Runtime for the taskpool executor
//!
//! Orchestrates all components: semaphores, bounded queues, the worker
//! thread pool and the executor that ties them together.
//!
//! # Architecture
//!
//! ```text
//!                      Executor<T>
//!                (admission + shutdown)
//!                     │          │
//!            ┌────────┘          └────────┐
//!            ▼                            ▼
//!       ThreadPool                dyn BoundedQueue<T>
//!   (core/max tiers,           (SemaphoreQueue | CondvarQueue)
//!    empty barrier,                       │
//!    shutdown flag)                       ▼
//!            │                     RingBuffer<T>
//!            ▼
//!     worker threads ──run──► TaskFuture<T> latches
//! ```

pub mod config;
pub mod events;
pub mod executor;
pub mod pool;
pub mod queue;
pub mod sema;

pub use config::{ExecutorConfig, KeepAlive, SaturationPolicy};
pub use events::{CountingObserver, ExecutorObserver, LogObserver, NoopObserver};
pub use executor::Executor;
pub use pool::ThreadPool;
pub use queue::{bounded_queue, BoundedQueue, CondvarQueue, QueueKind, SemaphoreQueue};
pub use sema::{new_semaphore, CondvarSemaphore, PlatformSemaphore, Semaphore};
