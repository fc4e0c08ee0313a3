//! Executor lifecycle observation
//!
//! A pluggable sink for lifecycle events: thread churn, queue traffic,
//! task outcomes. Purely informational - nothing in the executor's
//! correctness contract depends on an observer being installed.

use std::sync::atomic::{AtomicUsize, Ordering};

use taskpool_core::tp_debug;

/// Sink for executor lifecycle events.
///
/// All hooks default to no-ops; implement the ones you care about. Hooks
/// are called from submitter and worker threads, so implementations must
/// be cheap and must not block.
pub trait ExecutorObserver: Send + Sync {
    /// A worker thread was created.
    fn thread_spawned(&self) {}

    /// A worker thread deregistered and is about to exit.
    fn thread_exited(&self) {}

    /// A task was accepted into the pending queue.
    fn task_enqueued(&self) {}

    /// A worker pulled a task out of the pending queue.
    fn task_dequeued(&self) {}

    /// A task was refused admission or evicted.
    fn task_rejected(&self) {}

    /// A task iteration ran to completion.
    fn task_completed(&self) {}
}

/// Observer that ignores every event.
pub struct NoopObserver;

impl ExecutorObserver for NoopObserver {}

/// Observer that logs every event through the taskpool log macros.
pub struct LogObserver;

impl ExecutorObserver for LogObserver {
    fn thread_spawned(&self) {
        tp_debug!("[pool] worker spawned");
    }

    fn thread_exited(&self) {
        tp_debug!("[pool] worker exited");
    }

    fn task_enqueued(&self) {
        tp_debug!("[queue] task enqueued");
    }

    fn task_dequeued(&self) {
        tp_debug!("[queue] task dequeued");
    }

    fn task_rejected(&self) {
        tp_debug!("[executor] task rejected");
    }

    fn task_completed(&self) {
        tp_debug!("[executor] task completed");
    }
}

/// Observer that tallies events in atomic counters. Handy in tests.
#[derive(Default)]
pub struct CountingObserver {
    pub threads_spawned: AtomicUsize,
    pub threads_exited: AtomicUsize,
    pub tasks_enqueued: AtomicUsize,
    pub tasks_dequeued: AtomicUsize,
    pub tasks_rejected: AtomicUsize,
    pub tasks_completed: AtomicUsize,
}

impl CountingObserver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ExecutorObserver for CountingObserver {
    fn thread_spawned(&self) {
        self.threads_spawned.fetch_add(1, Ordering::SeqCst);
    }

    fn thread_exited(&self) {
        self.threads_exited.fetch_add(1, Ordering::SeqCst);
    }

    fn task_enqueued(&self) {
        self.tasks_enqueued.fetch_add(1, Ordering::SeqCst);
    }

    fn task_dequeued(&self) {
        self.tasks_dequeued.fetch_add(1, Ordering::SeqCst);
    }

    fn task_rejected(&self) {
        self.tasks_rejected.fetch_add(1, Ordering::SeqCst);
    }

    fn task_completed(&self) {
        self.tasks_completed.fetch_add(1, Ordering::SeqCst);
    }
}
