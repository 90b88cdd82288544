//! Typed scheduler errors
//!
//! Configuration and backend problems abort a run before any item executes.
//! Item faults never surface through this type at the run level; the executor
//! converts them into `Errored` outcomes.

use thiserror::Error;

/// Errors produced by the decision, translation and execution layers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Item '{item_id}' failed to execute: {message}")]
    ItemExecution { item_id: String, message: String },

    #[error("Isolated-process backend '{backend}' is unavailable: {reason}")]
    BackendUnavailable { backend: String, reason: String },
}

impl SchedulerError {
    pub fn invalid(message: impl Into<String>) -> Self {
        SchedulerError::InvalidConfiguration(message.into())
    }

    pub fn backend_unavailable(backend: impl Into<String>, reason: impl Into<String>) -> Self {
        SchedulerError::BackendUnavailable {
            backend: backend.into(),
            reason: reason.into(),
        }
    }
}
