//! Executor configuration
//!
//! Compile-time defaults with runtime environment overrides.
//!
//! # Configuration Priority (highest wins)
//!
//! 1. Builder setters (programmatic)
//! 2. Environment variables (`from_env`)
//! 3. Library defaults
//!
//! # Example
//!
//! ```rust,ignore
//! use taskpool_runtime::config::ExecutorConfig;
//!
//! let config = ExecutorConfig::from_env()
//!     .core_pool_size(4)
//!     .queue_capacity(64);
//! ```

use std::time::Duration;

use taskpool_core::env::env_get;
use taskpool_core::ConfigError;

use crate::queue::QueueKind;

/// How long an idle worker waits for new work before exiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepAlive {
    /// Idle workers never expire; they park until work or shutdown.
    Forever,
    /// Idle workers exit after this much time without work.
    After(Duration),
}

/// What `submit` does when both the thread pool and the queue are full.
///
/// Whatever the policy, no task is ever silently lost: a task refused
/// admission resolves its future with a rejection outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaturationPolicy {
    /// Resolve the new task's future with `TaskError::Rejected`.
    Reject,
    /// Pop the oldest queued task, resolve it rejected, admit the new one.
    EvictOldest,
    /// Block the submitter until room appears (rechecking for shutdown).
    Block,
}

/// Executor configuration with builder pattern.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Threads kept without needing the overflow path.
    pub core_pool_size: usize,
    /// Hard ceiling on concurrently live worker threads.
    pub max_pool_size: usize,
    /// Idle expiry for workers beyond their current task.
    pub keep_alive: KeepAlive,
    /// Pending-task queue capacity; 0 forces direct dispatch or rejection.
    pub queue_capacity: usize,
    /// Queue synchronization backend.
    pub queue_kind: QueueKind,
    /// Behavior when pool and queue are both full.
    pub saturation: SaturationPolicy,
}

mod defaults {
    pub const CORE_POOL_SIZE: usize = 2;
    pub const MAX_POOL_SIZE: usize = 8;
    pub const KEEP_ALIVE_MS: u64 = 0; // 0 = forever
    pub const QUEUE_CAPACITY: usize = 64;
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl ExecutorConfig {
    /// Create config from compile-time defaults with environment overrides.
    ///
    /// Environment variables (all optional):
    /// - `TP_CORE_POOL_SIZE` - Core-tier thread count
    /// - `TP_MAX_POOL_SIZE` - Total thread ceiling
    /// - `TP_KEEP_ALIVE_MS` - Idle expiry in milliseconds (0 = forever)
    /// - `TP_QUEUE_CAPACITY` - Pending-task queue capacity
    /// - `TP_QUEUE_BACKEND` - `sem` or `cond`
    /// - `TP_SATURATION` - `reject`, `evict` or `block`
    pub fn from_env() -> Self {
        let keep_alive_ms: u64 = env_get("TP_KEEP_ALIVE_MS", defaults::KEEP_ALIVE_MS);
        let queue_kind = std::env::var("TP_QUEUE_BACKEND")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(QueueKind::Condvar);
        let saturation = match std::env::var("TP_SATURATION").ok().as_deref() {
            Some("evict") => SaturationPolicy::EvictOldest,
            Some("block") => SaturationPolicy::Block,
            _ => SaturationPolicy::Reject,
        };
        Self {
            core_pool_size: env_get("TP_CORE_POOL_SIZE", defaults::CORE_POOL_SIZE),
            max_pool_size: env_get("TP_MAX_POOL_SIZE", defaults::MAX_POOL_SIZE),
            keep_alive: if keep_alive_ms == 0 {
                KeepAlive::Forever
            } else {
                KeepAlive::After(Duration::from_millis(keep_alive_ms))
            },
            queue_capacity: env_get("TP_QUEUE_CAPACITY", defaults::QUEUE_CAPACITY),
            queue_kind,
            saturation,
        }
    }

    /// Create config with explicit defaults (no env override).
    /// Useful for testing or when you want full control.
    pub fn new() -> Self {
        Self {
            core_pool_size: defaults::CORE_POOL_SIZE,
            max_pool_size: defaults::MAX_POOL_SIZE,
            keep_alive: KeepAlive::Forever,
            queue_capacity: defaults::QUEUE_CAPACITY,
            queue_kind: QueueKind::Condvar,
            saturation: SaturationPolicy::Reject,
        }
    }

    // Builder methods

    pub fn core_pool_size(mut self, n: usize) -> Self {
        self.core_pool_size = n;
        self
    }

    pub fn max_pool_size(mut self, n: usize) -> Self {
        self.max_pool_size = n;
        self
    }

    pub fn keep_alive(mut self, keep_alive: KeepAlive) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn queue_kind(mut self, kind: QueueKind) -> Self {
        self.queue_kind = kind;
        self
    }

    pub fn saturation(mut self, policy: SaturationPolicy) -> Self {
        self.saturation = policy;
        self
    }

    /// Validate configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_pool_size == 0 {
            return Err(ConfigError::InvalidValue("max_pool_size must be > 0"));
        }
        if self.max_pool_size < self.core_pool_size {
            return Err(ConfigError::InvalidValue(
                "max_pool_size must be >= core_pool_size",
            ));
        }
        if let KeepAlive::After(idle) = self.keep_alive {
            if idle.is_zero() {
                return Err(ConfigError::InvalidValue(
                    "keep_alive must be non-zero; use KeepAlive::Forever to disable expiry",
                ));
            }
        }
        // Evict and Block both need queue slots to ever make progress
        if self.queue_capacity == 0 && self.saturation != SaturationPolicy::Reject {
            return Err(ConfigError::InvalidValue(
                "a zero-capacity queue requires the reject saturation policy",
            ));
        }
        Ok(())
    }

    /// Print configuration (for debugging)
    pub fn print(&self) {
        eprintln!("taskpool configuration:");
        eprintln!("  core_pool_size:  {}", self.core_pool_size);
        eprintln!("  max_pool_size:   {}", self.max_pool_size);
        eprintln!("  keep_alive:      {:?}", self.keep_alive);
        eprintln!("  queue_capacity:  {}", self.queue_capacity);
        eprintln!("  queue_kind:      {:?}", self.queue_kind);
        eprintln!("  saturation:      {:?}", self.saturation);
    }
}
