use crate::core::domain::model::resource::ResourceType;
use std::backtrace::Backtrace;
use std::time::Duration;
use thiserror::Error;

/// The main error type for Oracle VM Manager operations.
///
/// Every failure a provisioning run can surface is one of these variants.
/// Errors from the job monitor propagate unmodified through the resource
/// operations into the orchestrator; nothing is swallowed past the clone
/// step, so a failed run always names the step that broke it.
#[derive(Error, Debug)]
pub enum OvmError {
    /// Network failure, a response body that is not JSON, or a mutating
    /// call whose response carries no job identifier.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A polled job reached the FAILURE run state. The message is the
    /// manager's `error` field, verbatim.
    #[error("Job failed: {message}")]
    JobFailed { message: String },

    /// A job (or readiness check) did not reach a terminal state within
    /// the configured poll timeout.
    #[error("Timed out after {waited:?} waiting on {job_id}")]
    Timeout { job_id: String, waited: Duration },

    /// The run's cancellation token was raised during a poll wait.
    /// Already-created resources are left on the manager.
    #[error("Provisioning run cancelled")]
    Cancelled,

    /// A name lookup found no match at the point the identifier was
    /// actually required.
    #[error("{kind} named '{name}' not found on the manager")]
    NotFound { kind: ResourceType, name: String },

    /// The caller-supplied spec violates a precondition. Raised before
    /// any remote call, never mid-run.
    #[error("Validation error: {source}")]
    Validation {
        source: ValidationError,
        trace: Backtrace,
    },
}

impl From<ValidationError> for OvmError {
    fn from(error: ValidationError) -> Self {
        OvmError::Validation {
            source: error,
            trace: Backtrace::capture(),
        }
    }
}

/// Specialized error type for spec validation failures.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// A validation failure tied to a specific spec field.
    #[error("Field '{field}' validation failed: {message}")]
    Field { field: String, message: String },

    /// Format/syntax violations (e.g. a malformed manager URL).
    #[error("Format error: {0}")]
    Format(String),

    /// Violations of domain constraints (e.g. memory granularity).
    #[error("Domain constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Type alias for Results that may fail with an OvmError.
pub type OvmResult<T> = Result<T, OvmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_converts_with_captured_trace() {
        let err: OvmError =
            ValidationError::ConstraintViolation("memory must be a multiple of 1024".to_string())
                .into();
        match err {
            OvmError::Validation { source, trace } => {
                assert_eq!(
                    source.to_string(),
                    "Domain constraint violation: memory must be a multiple of 1024"
                );
                let _ = trace.status();
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn validation_display_names_the_failing_field() {
        let err: OvmError = ValidationError::Field {
            field: "name".to_string(),
            message: "Name must not be empty".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Validation error: Field 'name' validation failed: Name must not be empty"
        );
    }
}
