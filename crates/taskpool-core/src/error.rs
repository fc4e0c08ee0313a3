//! Error types for the taskpool executor

use core::fmt;

/// Result type for task outcomes
pub type TaskResult<T> = Result<T, TaskError>;

/// Why a task future resolved without a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The task was refused admission (saturation policy, eviction, or
    /// submission after shutdown)
    Rejected,

    /// The executor shut down before the task was picked up
    ShutDown,

    /// The work closure panicked; the worker thread survived
    Panicked,
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskError::Rejected => write!(f, "task rejected"),
            TaskError::ShutDown => write!(f, "executor shut down before the task ran"),
            TaskError::Panicked => write!(f, "task panicked"),
        }
    }
}

impl std::error::Error for TaskError {}

/// Configuration error
///
/// Construction-time resource or parameter problems are fatal; everything
/// that can happen after construction is an ordinary [`TaskError`] outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
