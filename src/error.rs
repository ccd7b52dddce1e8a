//! # Error types
//!
//! Input-validity failures are the only thing this crate returns as `Err`;
//! scheduling-invariant violations are programmer errors and are checked
//! with `debug_assert!`/`unreachable!` instead (see module docs on
//! [`crate::scheduler`]).

use thiserror::Error;

/// Everything that can go wrong loading or validating a task set.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("duplicate task id {0}")]
    DuplicateTaskId(i64),

    #[error("task {0} is aperiodic but has no positive relative deadline")]
    AperiodicTaskMissingDeadline(i64),

    #[error("task {task_id} release at {release} is not after the previous release {previous}")]
    NonMonotonicRelease {
        task_id: i64,
        previous: i64,
        release: i64,
    },

    #[error("failed to read task set file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse task set JSON: {0}")]
    Json(#[from] serde_json::Error),
}
