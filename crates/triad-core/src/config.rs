//! Engine configuration.
//!
//! All sections deserialize from TOML (or any serde format) and every
//! field has a default, so an empty config is a valid config.

use std::time::Duration;

use serde::Deserialize;

use crate::verify::PipelineMode;

/// Top-level configuration for the triad engine.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct TriadConfig {
    /// Classifier settings.
    pub classifier: ClassifierConfig,
    /// Verification pipeline settings.
    pub pipeline: PipelineConfig,
    /// Engine-level policy settings.
    pub engine: EngineConfig,
}

/// Classifier settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassifierConfig {
    /// How many correction exemplars to embed in the prompt.
    pub exemplar_limit: usize,
    /// Per-call inference deadline in milliseconds.
    pub timeout_ms: u64,
    /// Sampling temperature for classification calls.
    pub temperature: f64,
    /// Nucleus sampling threshold for classification calls.
    pub top_p: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            exemplar_limit: 5,
            timeout_ms: 30_000,
            temperature: 0.1,
            top_p: 0.9,
        }
    }
}

impl ClassifierConfig {
    /// The configured deadline as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Verification pipeline settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Default aggregation mode when the caller does not pick one.
    pub mode: PipelineMode,
    /// Minimum number of passing stages for lenient approval. Safety
    /// must pass regardless of this number.
    pub min_passes: usize,
    /// Per-call deadline for the intent judge in milliseconds.
    pub judge_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: PipelineMode::Lenient,
            min_passes: 3,
            judge_timeout_ms: 30_000,
        }
    }
}

impl PipelineConfig {
    /// The configured judge deadline as a `Duration`.
    pub fn judge_timeout(&self) -> Duration {
        Duration::from_millis(self.judge_timeout_ms)
    }
}

/// Engine-level policy settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// When the classifier output cannot be parsed, substitute the
    /// conservative low-confidence classification so the request
    /// routes to the human fallback instead of failing the whole
    /// operation. When false, the parse error surfaces to the caller.
    pub parse_error_fallback: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parse_error_fallback: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_is_valid() {
        let config: TriadConfig = toml::from_str("").unwrap();
        assert_eq!(config, TriadConfig::default());
        assert_eq!(config.classifier.exemplar_limit, 5);
        assert_eq!(config.pipeline.min_passes, 3);
        assert!(config.engine.parse_error_fallback);
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let config: TriadConfig = toml::from_str(
            r#"
            [classifier]
            exemplar_limit = 10
            timeout_ms = 5000

            [pipeline]
            mode = "strict"
            "#,
        )
        .unwrap();
        assert_eq!(config.classifier.exemplar_limit, 10);
        assert_eq!(config.classifier.timeout(), Duration::from_secs(5));
        assert_eq!(config.classifier.temperature, 0.1);
        assert_eq!(config.pipeline.mode, PipelineMode::Strict);
        assert_eq!(config.pipeline.min_passes, 3);
    }

    #[test]
    fn durations_derive_from_millis() {
        let config = PipelineConfig {
            judge_timeout_ms: 1500,
            ..PipelineConfig::default()
        };
        assert_eq!(config.judge_timeout(), Duration::from_millis(1500));
    }
}
