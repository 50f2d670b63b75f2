//! Error types for inference calls.
//!
//! All inference operations return [`Result<T>`] which uses
//! [`InferenceError`] as the error type. The variants map onto the
//! engine-level kinds in `triad_types::TriadError` via `From`.

use thiserror::Error;

use triad_types::TriadError;

/// Errors that can occur when calling the inference service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InferenceError {
    /// The call exceeded its per-call deadline.
    #[error("inference timed out after {timeout_ms}ms")]
    Timeout {
        /// The deadline that was exceeded, in milliseconds.
        timeout_ms: u64,
    },

    /// The backend was unreachable or returned an error.
    #[error("backend error: {0}")]
    Backend(String),

    /// The backend is throttling requests (HTTP 429 and friends).
    #[error("backend rate limited: retry after {retry_after_ms}ms")]
    RateLimited {
        /// Suggested wait time before retrying, in milliseconds.
        retry_after_ms: u64,
    },

    /// The backend answered with something that is not a completion.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// A convenience alias for inference operations.
pub type Result<T> = std::result::Result<T, InferenceError>;

impl From<InferenceError> for TriadError {
    fn from(err: InferenceError) -> Self {
        match err {
            InferenceError::Timeout { timeout_ms } => TriadError::InferenceTimeout { timeout_ms },
            // Backend throttling is a backend failure from the core's
            // point of view; RateLimitExceeded is reserved for the
            // rate-limit gate refusing before any call is made.
            other => TriadError::InferenceFailure {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_timeout() {
        let err = InferenceError::Timeout { timeout_ms: 5000 };
        assert_eq!(err.to_string(), "inference timed out after 5000ms");
    }

    #[test]
    fn display_backend() {
        let err = InferenceError::Backend("connection refused".into());
        assert_eq!(err.to_string(), "backend error: connection refused");
    }

    #[test]
    fn display_rate_limited() {
        let err = InferenceError::RateLimited { retry_after_ms: 2000 };
        assert_eq!(err.to_string(), "backend rate limited: retry after 2000ms");
    }

    #[test]
    fn timeout_maps_to_inference_timeout() {
        let err: TriadError = InferenceError::Timeout { timeout_ms: 100 }.into();
        assert!(matches!(err, TriadError::InferenceTimeout { timeout_ms: 100 }));
    }

    #[test]
    fn backend_errors_map_to_inference_failure() {
        let err: TriadError = InferenceError::Backend("boom".into()).into();
        assert!(matches!(err, TriadError::InferenceFailure { .. }));

        let err: TriadError = InferenceError::RateLimited { retry_after_ms: 1 }.into();
        assert!(
            matches!(err, TriadError::InferenceFailure { .. }),
            "backend throttling is not the gate's RateLimitExceeded"
        );
    }
}
