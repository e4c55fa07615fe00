//! Error taxonomy for the scheduler control plane.
//!
//! Every mutating operation across the three components either reaches a
//! terminal success state and persists, or leaves state unchanged and
//! returns one of these variants. Errors are grouped along the kinds
//! listed by the error handling design: validation, not-found, conflict,
//! transient upstream, persistent upstream, and internal, plus a handful of
//! ambient variants the durable store/queue plumbing needs for its own
//! failures.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum SchedulerError {
    /// A required payload field was missing or malformed. Never retried.
    #[error("validation failed: {field} - {reason}")]
    Validation { field: String, reason: String },

    /// The referenced entity does not exist. Never healed.
    #[error("not found: {resource}")]
    NotFound { resource: String },

    /// The operation conflicts with in-progress state (e.g. a full sync
    /// already running).
    #[error("conflict: {reason}")]
    Conflict { reason: String },

    /// An upstream failure expected to clear on retry. Drives
    /// `retry_with_backoff` healing.
    #[error("transient upstream error in {operation}: {reason}")]
    TransientUpstream { operation: String, reason: String },

    /// An upstream failure that has exhausted simple retry and should climb
    /// the escalation graph.
    #[error("persistent upstream error in {operation}: {reason}")]
    PersistentUpstream { operation: String, reason: String },

    /// A failure internal to this process, unrelated to any external
    /// collaborator. Promoted to a high-severity healing task.
    #[error("internal error in {component}: {reason}")]
    Internal { component: String, reason: String },

    /// Configuration failed to load or did not pass validation.
    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    /// The durable store could not load or persist component state.
    #[error("persistence error during {operation}: {reason}")]
    Persistence { operation: String, reason: String },

    /// A queue adapter failed to enqueue, consume, or ack a message.
    #[error("queue error on {queue}: {reason}")]
    Queue { queue: String, reason: String },

    /// A component received a request before its durable state finished
    /// hydrating.
    #[error("component not ready: {component}")]
    NotReady { component: String },
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Context attached to an error for log correlation, mirroring the
/// request-id threading used across the HTTP adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    pub operation: String,
    pub component: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub request_id: Option<String>,
}

impl ErrorContext {
    #[must_use]
    pub fn new(operation: &str, component: &str) -> Self {
        Self {
            operation: operation.to_string(),
            component: component.to_string(),
            timestamp: chrono::Utc::now(),
            request_id: None,
        }
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: String) -> Self {
        self.request_id = Some(request_id);
        self
    }
}

/// Helper trait for attaching operation/component context to a `Result`
/// before it crosses a component boundary.
pub trait ResultExt<T> {
    fn with_context(self, operation: &str, component: &str) -> SchedulerResult<T>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: std::fmt::Display,
{
    fn with_context(self, operation: &str, component: &str) -> SchedulerResult<T> {
        self.map_err(|e| SchedulerError::Internal {
            component: component.to_string(),
            reason: format!("{operation}: {e}"),
        })
    }
}

impl From<serde_json::Error> for SchedulerError {
    fn from(err: serde_json::Error) -> Self {
        SchedulerError::Persistence {
            operation: "serde_json".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<std::io::Error> for SchedulerError {
    fn from(err: std::io::Error) -> Self {
        SchedulerError::Persistence {
            operation: "io".to_string(),
            reason: err.to_string(),
        }
    }
}
