//! Error types for the triad engine.
//!
//! [`TriadError`] is the top-level error type. Every way a call into the
//! core can fail has its own kind, so callers can always distinguish
//! *why* -- the core never substitutes a default classification or a
//! default verdict for an error.

use thiserror::Error;
use uuid::Uuid;

use crate::operation::OperationStatus;

/// Top-level error type for the triad engine.
///
/// Inference-related kinds (`InferenceTimeout`, `InferenceFailure`,
/// `ClassificationParse`, `RateLimitExceeded`) are deliberately distinct:
/// a timeout is not a backend error, and a refusal from the rate-limit
/// gate happens before any inference call is attempted.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TriadError {
    /// An inference call exceeded its per-call deadline.
    #[error("inference timed out after {timeout_ms}ms")]
    InferenceTimeout {
        /// The deadline that was exceeded, in milliseconds.
        timeout_ms: u64,
    },

    /// The inference backend was unreachable or returned an error.
    #[error("inference failed: {message}")]
    InferenceFailure {
        /// Backend-supplied error message.
        message: String,
    },

    /// Inference output could not be coerced to the taxonomy, even
    /// after one repair pass.
    #[error("classification output unparseable: {detail}")]
    ClassificationParse {
        /// What went wrong during parsing.
        detail: String,
        /// The raw model output, kept for diagnosis.
        raw: String,
    },

    /// No routing table entry for an otherwise-valid classification.
    /// Defensive -- the built-in table covers the whole taxonomy space.
    #[error("no route for classification: {detail}")]
    Routing {
        /// The classification triple that failed to route.
        detail: String,
    },

    /// A verifier's external dependency failed. Distinct from the
    /// stage's content verdict: "the judge could not be reached" is not
    /// "the judge found misalignment".
    #[error("verifier infrastructure failure in {stage}: {message}")]
    VerifierInfrastructure {
        /// The stage whose dependency failed.
        stage: String,
        /// What failed.
        message: String,
    },

    /// Feedback referenced an operation that does not exist.
    #[error("operation not found: {operation_id}")]
    NotFound {
        /// The id that failed to resolve.
        operation_id: Uuid,
    },

    /// The rate-limiting collaborator refused the request before any
    /// inference call was attempted.
    #[error("rate limit exceeded for {user_id}")]
    RateLimitExceeded {
        /// The user whose request was refused.
        user_id: String,
    },

    /// An operation status change the state machine does not permit.
    #[error("invalid status transition: {from:?} -> {to:?}")]
    InvalidTransition {
        /// The state the operation is in.
        from: OperationStatus,
        /// The state that was requested.
        to: OperationStatus,
    },

    /// A dispatch call named a method that is not in the table.
    #[error("unknown method: {method}")]
    UnknownMethod {
        /// The method name that failed to resolve.
        method: String,
    },

    /// JSON serialization / deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A convenience alias used throughout the triad crates.
pub type Result<T> = std::result::Result<T, TriadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inference_timeout_display() {
        let err = TriadError::InferenceTimeout { timeout_ms: 30_000 };
        assert_eq!(err.to_string(), "inference timed out after 30000ms");
    }

    #[test]
    fn not_found_display_includes_id() {
        let id = Uuid::new_v4();
        let err = TriadError::NotFound { operation_id: id };
        assert!(err.to_string().contains(&id.to_string()));
    }

    #[test]
    fn invalid_transition_display() {
        let err = TriadError::InvalidTransition {
            from: OperationStatus::Verifying,
            to: OperationStatus::Created,
        };
        assert_eq!(
            err.to_string(),
            "invalid status transition: Verifying -> Created"
        );
    }

    #[test]
    fn json_error_from_conversion() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{{bad}}").unwrap_err();
        let err: TriadError = serde_err.into();
        assert!(matches!(err, TriadError::Json(_)));
    }

    #[test]
    fn parse_error_keeps_raw_output() {
        let err = TriadError::ClassificationParse {
            detail: "missing field `destination`".into(),
            raw: "not json".into(),
        };
        // Display carries the detail; the raw output stays structured.
        assert!(err.to_string().contains("missing field"));
        match err {
            TriadError::ClassificationParse { raw, .. } => assert_eq!(raw, "not json"),
            _ => unreachable!(),
        }
    }

    #[test]
    fn result_alias_works() {
        fn ok_fn() -> Result<u8> {
            Ok(7)
        }
        fn err_fn() -> Result<u8> {
            Err(TriadError::RateLimitExceeded {
                user_id: "u-1".into(),
            })
        }
        assert_eq!(ok_fn().unwrap(), 7);
        assert!(err_fn().is_err());
    }
}
