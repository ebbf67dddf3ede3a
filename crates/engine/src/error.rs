//! The seven-category error taxonomy, realized as one enum reused by the
//! reporter's retry wrapper, the notification controller's reconnect
//! classification, and every state machine's completion reporting.

use taskagent_core::IdentityError;
use tonic::{Code, Status};

/// A classified failure. The doc comment on each variant names the category
/// it belongs to.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TaskError {
    /// PERMISSION_DENIED. Not retried; forces agent shutdown.
    #[error("service disabled: {0}")]
    ServiceDisabled(String),

    /// RESOURCE_EXHAUSTED. Retried with extended backoff.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Identity source reports "no service account set".
    #[error("no identity: {0}")]
    NoIdentity(#[from] IdentityError),

    /// Transient transport error, surfaced once the retry budget for
    /// the call is exhausted.
    #[error("transient rpc failure: {0}")]
    Transient(Status),

    /// Any other classified gRPC status (INVALID_ARGUMENT, NOT_FOUND, ...) —
    /// returned immediately, no retry.
    #[error("rpc failed: {0}")]
    Rpc(Status),

    /// Task infrastructure error (progress-report failure, state-save
    /// failure, unknown task step). Reported as completion FAILED.
    #[error("task infrastructure error: {0}")]
    Infrastructure(String),

    /// Server-initiated cancellation via a `STOP` directive.
    #[error("server requested cancellation")]
    ServerCancel,

    /// Panic recovered at the task boundary.
    #[error("panicked: {0}")]
    Panicked(String),
}

impl TaskError {
    /// Classifies a `tonic::Status` per the retry contract.
    pub fn from_status(status: Status) -> Self {
        match status.code() {
            Code::PermissionDenied => TaskError::ServiceDisabled(status.message().to_string()),
            Code::ResourceExhausted => TaskError::ResourceExhausted(status.message().to_string()),
            code if crate::backoff::is_retryable_transient(code) => TaskError::Transient(status),
            _ => TaskError::Rpc(status),
        }
    }

    /// Whether this error should force the process to shut down.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TaskError::ServiceDisabled(_) | TaskError::NoIdentity(_))
    }
}

impl From<Status> for TaskError {
    fn from(status: Status) -> Self {
        TaskError::from_status(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_denied_is_service_disabled_and_fatal() {
        let err = TaskError::from_status(Status::permission_denied("nope"));
        assert!(matches!(err, TaskError::ServiceDisabled(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn resource_exhausted_is_not_fatal() {
        let err = TaskError::from_status(Status::resource_exhausted("quota"));
        assert!(matches!(err, TaskError::ResourceExhausted(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn unavailable_is_transient() {
        let err = TaskError::from_status(Status::unavailable("down"));
        assert!(matches!(err, TaskError::Transient(_)));
    }

    #[test]
    fn invalid_argument_is_plain_rpc_error() {
        let err = TaskError::from_status(Status::invalid_argument("bad"));
        assert!(matches!(err, TaskError::Rpc(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn no_identity_is_fatal() {
        let err = TaskError::from(IdentityError::NoServiceAccount);
        assert!(err.is_fatal());
    }
}
