//! Canned inference service for deterministic tests.
//!
//! The classifier and the intent verifier must be deterministic with
//! respect to their inputs under test: substituting a canned response
//! must yield a canned result. [`CannedInference`] provides that, plus
//! call recording so tests can assert on the prompts that were built.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{InferenceError, Result};
use crate::options::InferenceOptions;
use crate::service::InferenceService;

/// One recorded call to a [`CannedInference`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// The system prompt the caller built.
    pub system: String,
    /// The user prompt the caller built.
    pub user: String,
}

/// An [`InferenceService`] that answers every call with a canned
/// response or a canned error, recording the prompts it was given.
pub struct CannedInference {
    response: std::result::Result<String, InferenceError>,
    model: String,
    delay: Option<Duration>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl CannedInference {
    /// A service that answers every call with `response`.
    pub fn returning(response: impl Into<String>) -> Self {
        Self {
            response: Ok(response.into()),
            model: "canned-model".into(),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A service that fails every call with `error`.
    pub fn failing(error: InferenceError) -> Self {
        Self {
            response: Err(error),
            model: "canned-model".into(),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Override the reported model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sleep for `delay` before answering, to exercise timeout paths.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// How many calls have been made.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// The system prompt of the most recent call, if any.
    pub fn last_system(&self) -> Option<String> {
        self.calls.lock().unwrap().last().map(|c| c.system.clone())
    }

    /// The user prompt of the most recent call, if any.
    pub fn last_user(&self) -> Option<String> {
        self.calls.lock().unwrap().last().map(|c| c.user.clone())
    }
}

#[async_trait]
impl InferenceService for CannedInference {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        system: &str,
        user: &str,
        _options: &InferenceOptions,
    ) -> Result<String> {
        self.calls.lock().unwrap().push(RecordedCall {
            system: system.to_string(),
            user: user.to_string(),
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.response.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_canned_response_and_records_call() {
        let svc = CannedInference::returning("hello").with_model("test-model-1b");
        let opts = InferenceOptions::text(Duration::from_secs(1));

        let out = svc.complete("SYS", "USER", &opts).await.unwrap();

        assert_eq!(out, "hello");
        assert_eq!(svc.model(), "test-model-1b");
        assert_eq!(svc.call_count(), 1);
        assert_eq!(svc.last_system().as_deref(), Some("SYS"));
        assert_eq!(svc.last_user().as_deref(), Some("USER"));
    }

    #[tokio::test]
    async fn returns_canned_error_every_time() {
        let svc = CannedInference::failing(InferenceError::Backend("refused".into()));
        let opts = InferenceOptions::text(Duration::from_secs(1));

        for _ in 0..3 {
            let err = svc.complete("s", "u", &opts).await.unwrap_err();
            assert_eq!(err, InferenceError::Backend("refused".into()));
        }
        assert_eq!(svc.call_count(), 3);
    }
}
