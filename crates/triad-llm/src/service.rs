//! The core [`InferenceService`] trait.
//!
//! All inference backends implement this trait, which provides a single
//! `complete` method taking a system prompt, a user prompt, and per-call
//! options. The classifier and the intent verifier consume it through
//! [`complete_with_deadline`], which enforces the caller-side timeout.

use async_trait::async_trait;
use tracing::warn;

use crate::error::{InferenceError, Result};
use crate::options::InferenceOptions;

/// A service that can answer classification and generation prompts.
///
/// Implementations handle the protocol details for a specific backend
/// (local or hosted). Each call is synchronous from the caller's point
/// of view: the caller suspends until a response or a timeout arrives.
/// Calls for independent operations may run concurrently; no shared
/// mutable state is touched during a call.
#[async_trait]
pub trait InferenceService: Send + Sync {
    /// The model name this service answers with (e.g. "llama3.2:1b").
    /// Recorded in classification audit logs.
    fn model(&self) -> &str;

    /// Execute a completion and return the raw response text.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError`] if the backend is unreachable, errors,
    /// throttles, or answers with something that is not a completion.
    /// Implementations may honor `options.timeout` themselves, but
    /// callers should not rely on it -- [`complete_with_deadline`]
    /// enforces the deadline regardless.
    async fn complete(
        &self,
        system: &str,
        user: &str,
        options: &InferenceOptions,
    ) -> Result<String>;
}

/// Call `service.complete` with the deadline in `options` enforced on
/// the caller's side.
///
/// An elapsed deadline yields [`InferenceError::Timeout`], distinct from
/// a backend error, whatever the backend was doing at the time.
pub async fn complete_with_deadline(
    service: &dyn InferenceService,
    system: &str,
    user: &str,
    options: &InferenceOptions,
) -> Result<String> {
    match tokio::time::timeout(options.timeout, service.complete(system, user, options)).await {
        Ok(result) => result,
        Err(_) => {
            let timeout_ms = options.timeout.as_millis() as u64;
            warn!(model = service.model(), timeout_ms, "inference call timed out");
            Err(InferenceError::Timeout { timeout_ms })
        }
    }
}
