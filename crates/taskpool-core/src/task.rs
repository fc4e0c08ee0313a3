//! Task model: callables and the futures that report their results
//!
//! A [`Callable`] is a unit of work (a closure plus an optional execution
//! period). Submitting one to the executor wraps it in a [`TaskFuture`],
//! the handle through which any number of threads can block for - and
//! read - the result.
//!
//! The future doubles as the hand-off cell between submitter and worker:
//! the worker that picks the task up takes the callable out of the future
//! and owns it until the task is finished.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crate::error::{TaskError, TaskResult};

/// A unit of work: a closure plus an optional re-execution period.
///
/// One-shot callables run exactly once. Periodic callables are re-invoked
/// by their worker at fixed absolute intervals until the executor shuts
/// down. The closure is `FnMut` so periodic work can keep state between
/// iterations.
pub struct Callable<T> {
    work: Box<dyn FnMut() -> T + Send>,
    period: Option<Duration>,
}

impl<T> Callable<T> {
    /// A callable that runs exactly once.
    pub fn once<F>(work: F) -> Self
    where
        F: FnMut() -> T + Send + 'static,
    {
        Self {
            work: Box::new(work),
            period: None,
        }
    }

    /// A callable re-invoked every `period` until shutdown.
    ///
    /// Iteration deadlines are absolute (`start + n * period`), so the
    /// runtime of the work closure never accumulates drift.
    pub fn periodic<F>(period: Duration, work: F) -> Self
    where
        F: FnMut() -> T + Send + 'static,
    {
        assert!(!period.is_zero(), "periodic callable needs a non-zero period");
        Self {
            work: Box::new(work),
            period: Some(period),
        }
    }

    /// The re-execution period, `None` for one-shot callables.
    #[inline]
    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    /// Invoke the work closure. Executor-side.
    #[inline]
    pub fn call(&mut self) -> T {
        (self.work)()
    }
}

impl<T> std::fmt::Debug for Callable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callable")
            .field("period", &self.period)
            .finish_non_exhaustive()
    }
}

/// Result/completion handle for a submitted callable.
///
/// Cloning is cheap (shared inner state). [`wait`](TaskFuture::wait) is a
/// broadcast latch: every thread blocked on it observes the same result
/// once the worker completes the task.
///
/// Periodic callables reuse one future across iterations: each iteration
/// closes the latch when it starts and reopens it with a fresh result when
/// it completes. A caller that waits again after the next iteration has
/// started will therefore observe that newer iteration's result, not the
/// one it originally awaited.
pub struct TaskFuture<T> {
    inner: Arc<FutureInner<T>>,
}

struct FutureInner<T> {
    /// Taken by the worker that runs the task; `None` afterwards.
    callable: Mutex<Option<Callable<T>>>,
    period: Option<Duration>,
    state: Mutex<FutureState<T>>,
    done: Condvar,
}

struct FutureState<T> {
    result: Option<TaskResult<T>>,
    completed: bool,
}

impl<T> Clone for TaskFuture<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> TaskFuture<T> {
    /// Wrap a callable in a fresh, incomplete future.
    pub fn new(callable: Callable<T>) -> Self {
        let period = callable.period();
        Self {
            inner: Arc::new(FutureInner {
                callable: Mutex::new(Some(callable)),
                period,
                state: Mutex::new(FutureState {
                    result: None,
                    completed: false,
                }),
                done: Condvar::new(),
            }),
        }
    }

    /// A future already resolved with [`TaskError::Rejected`].
    ///
    /// Returned for submissions the executor refuses (saturation, or
    /// arrival after shutdown) so the caller never holds a future that
    /// blocks forever.
    pub fn rejected() -> Self {
        Self {
            inner: Arc::new(FutureInner {
                callable: Mutex::new(None),
                period: None,
                state: Mutex::new(FutureState {
                    result: Some(Err(TaskError::Rejected)),
                    completed: true,
                }),
                done: Condvar::new(),
            }),
        }
    }

    /// The wrapped callable's period, `None` for one-shot tasks.
    #[inline]
    pub fn period(&self) -> Option<Duration> {
        self.inner.period
    }

    /// Whether the current iteration has completed.
    pub fn is_completed(&self) -> bool {
        self.inner.state.lock().unwrap().completed
    }

    /// Block until the task completes, then return its result.
    ///
    /// Any number of threads may wait concurrently; all observe the same
    /// result. After a one-shot task completes the result is stable:
    /// repeated calls return the same value. See the type docs for the
    /// periodic-reuse caveat.
    pub fn wait(&self) -> TaskResult<T>
    where
        T: Clone,
    {
        let mut state = self.inner.state.lock().unwrap();
        while !state.completed {
            state = self.inner.done.wait(state).unwrap();
        }
        state.result.clone().expect("completed future has a result")
    }

    /// Non-blocking result peek: `None` while the task is still running.
    pub fn try_result(&self) -> Option<TaskResult<T>>
    where
        T: Clone,
    {
        let state = self.inner.state.lock().unwrap();
        if state.completed {
            state.result.clone()
        } else {
            None
        }
    }

    // ------------------------------------------------------------------
    // Worker-side operations
    // ------------------------------------------------------------------

    /// Take ownership of the callable. Executor-side; returns `None` if a
    /// worker already took it.
    pub fn take_callable(&self) -> Option<Callable<T>> {
        self.inner.callable.lock().unwrap().take()
    }

    /// Store a value and release every waiter. Executor-side.
    pub fn complete(&self, value: T) {
        self.finish(Ok(value));
    }

    /// Resolve without a value and release every waiter. Executor-side.
    ///
    /// A future that already holds a result keeps it; failure never
    /// overwrites a delivered value.
    pub fn fail(&self, err: TaskError) {
        let mut state = self.inner.state.lock().unwrap();
        if state.completed {
            return;
        }
        state.result = Some(Err(err));
        state.completed = true;
        drop(state);
        self.inner.done.notify_all();
    }

    /// Reopen the latch for the next periodic iteration. Executor-side.
    ///
    /// The previous result stays readable through `try_result` callers
    /// already holding it; new `wait` calls block until the iteration
    /// completes.
    pub fn rearm(&self) {
        let mut state = self.inner.state.lock().unwrap();
        state.completed = false;
    }

    fn finish(&self, result: TaskResult<T>) {
        let mut state = self.inner.state.lock().unwrap();
        state.result = Some(result);
        state.completed = true;
        drop(state);
        self.inner.done.notify_all();
    }
}

impl<T> std::fmt::Debug for TaskFuture<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskFuture")
            .field("period", &self.inner.period)
            .field("completed", &self.is_completed())
            .finish()
    }
}
