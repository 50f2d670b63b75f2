//! Per-call options for inference requests.

use std::time::Duration;

/// Options for a single inference call.
///
/// The timeout is mandatory by construction: there is no way to build
/// options without one, and [`complete_with_deadline`] enforces it on
/// the caller's side regardless of backend behavior.
///
/// [`complete_with_deadline`]: crate::service::complete_with_deadline
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceOptions {
    /// Hard deadline for the call.
    pub timeout: Duration,

    /// Sampling temperature, if the caller wants to override the
    /// backend default.
    pub temperature: Option<f64>,

    /// Nucleus sampling threshold, if the caller wants to override the
    /// backend default.
    pub top_p: Option<f64>,

    /// Whether the caller requires strictly machine-parseable JSON
    /// output. Backends with a JSON mode should enable it.
    pub json_output: bool,
}

impl InferenceOptions {
    /// Options for a free-text completion.
    pub fn text(timeout: Duration) -> Self {
        Self {
            timeout,
            temperature: None,
            top_p: None,
            json_output: false,
        }
    }

    /// Options for a structured-output completion.
    pub fn json(timeout: Duration) -> Self {
        Self {
            json_output: true,
            ..Self::text(timeout)
        }
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the nucleus sampling threshold.
    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_options_defaults() {
        let opts = InferenceOptions::text(Duration::from_secs(30));
        assert_eq!(opts.timeout, Duration::from_secs(30));
        assert!(!opts.json_output);
        assert!(opts.temperature.is_none());
        assert!(opts.top_p.is_none());
    }

    #[test]
    fn json_options_enable_json_output() {
        let opts = InferenceOptions::json(Duration::from_secs(10));
        assert!(opts.json_output);
    }

    #[test]
    fn builder_methods() {
        let opts = InferenceOptions::json(Duration::from_secs(10))
            .with_temperature(0.1)
            .with_top_p(0.9);
        assert_eq!(opts.temperature, Some(0.1));
        assert_eq!(opts.top_p, Some(0.9));
    }
}
