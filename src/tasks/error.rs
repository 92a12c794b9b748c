//! Error types for the task store.

use thiserror::Error;

/// Task store error type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskError {
    /// No task with the given id.
    #[error("task not found: {0}")]
    NotFound(String),

    /// Title was empty after trimming.
    #[error("task title must not be empty")]
    EmptyTitle,

    /// Estimate was zero.
    #[error("estimated pomodoros must be at least 1")]
    ZeroEstimate,

    /// A reorder list was not a permutation of the current ids.
    #[error("reorder must list every task exactly once")]
    InvalidOrder,
}

/// Result type for task store operations.
pub type Result<T> = std::result::Result<T, TaskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TaskError::NotFound("abc".to_string());
        assert_eq!(err.to_string(), "task not found: abc");
        assert!(TaskError::InvalidOrder.to_string().contains("exactly once"));
    }
}
