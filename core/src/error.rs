//! Structured error types for the cat picker backend
//!
//! Loop-level failures propagate to the caller as [`Error`]. Tool-level
//! failures never show up here: the cat search folds them into the tool
//! output so the remote run can always resume.

use std::time::Duration;
use thiserror::Error;

use crate::assistant::RunStatus;

/// Primary error type for catpicker operations
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Setup Errors
    // =========================================================================
    /// Assistant or session could not be set up
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Request payload violates an invariant of the message contract
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    // =========================================================================
    // Remote Service Errors
    // =========================================================================
    /// Transport or remote failure on a conversational-service call
    #[error("upstream error during {operation}: {message}")]
    Upstream {
        operation: &'static str,
        message: String,
    },

    // =========================================================================
    // Run Loop Errors
    // =========================================================================
    /// Tool call arguments could not be parsed
    #[error("invalid tool arguments for {tool_name}: {reason}")]
    ToolArgument { tool_name: String, reason: String },

    /// Run did not reach a terminal state in time
    #[error("run timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Run loop was cancelled by the caller
    #[error("run cancelled")]
    Cancelled,

    /// Run ended in a terminal non-success state
    #[error("run ended with status {state}{}", detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
    RunFailed {
        state: RunStatus,
        detail: Option<String>,
    },
}

impl Error {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn upstream(operation: &'static str, message: impl std::fmt::Display) -> Self {
        Self::Upstream {
            operation,
            message: message.to_string(),
        }
    }

    /// Check if error is transient. Nothing in the crate retries on its own;
    /// this is for callers that want to.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Upstream { .. } | Self::Timeout { .. } => true,
            Self::Configuration { .. }
            | Self::InvalidInput { .. }
            | Self::ToolArgument { .. }
            | Self::Cancelled
            | Self::RunFailed { .. } => false,
        }
    }

    /// Whether the failure was caused by the caller's request
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput { .. })
    }
}

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(Error::Timeout {
            duration: Duration::from_secs(60)
        }
        .is_retryable());
        assert!(Error::upstream("create_run", "connection reset").is_retryable());

        assert!(!Error::RunFailed {
            state: RunStatus::Failed,
            detail: None,
        }
        .is_retryable());
        assert!(!Error::configuration("no assistant").is_retryable());
    }

    #[test]
    fn test_run_failed_message() {
        let err = Error::RunFailed {
            state: RunStatus::Expired,
            detail: None,
        };
        assert_eq!(err.to_string(), "run ended with status expired");

        let err = Error::RunFailed {
            state: RunStatus::Failed,
            detail: Some("rate_limit_exceeded".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "run ended with status failed: rate_limit_exceeded"
        );
    }

    #[test]
    fn test_client_error() {
        let err = Error::InvalidInput {
            message: "role must be user".to_string(),
        };
        assert!(err.is_client_error());
        assert!(!Error::Cancelled.is_client_error());
    }
}
