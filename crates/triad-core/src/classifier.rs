//! LLM-backed request classification.
//!
//! Builds a structured prompt embedding the taxonomy definition and any
//! correction exemplars, asks the inference service for strictly
//! machine-parseable JSON, and parses the result into a
//! [`Classification`]. One repair pass, then the parse error surfaces;
//! the classifier never guesses a default -- fallback policy belongs to
//! its callers.

use std::fmt::Write as _;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use triad_llm::{InferenceOptions, InferenceService, complete_with_deadline};
use triad_types::{Classification, Consumer, CorrectionExemplar, Destination, Result, Semantics, TriadError};

use crate::config::ClassifierConfig;
use crate::json_repair::repair_json;

/// System prompt framing the classification task. Exemplars, when
/// present, are appended by [`Classifier::build_system_prompt`].
const SYSTEM_PROMPT: &str = "\
You classify a user request along three independent axes and reply with \
a single JSON object, nothing else.

Axes:
- destination: where the result goes
  - \"stream\": ephemeral output, displayed once
  - \"file\": persistent storage in a file
  - \"process\": spawns or controls a system process
- consumer: who consumes the result
  - \"human\": a person reads and interprets it
  - \"machine\": another program processes it further
- semantics: what kind of action the request performs
  - \"read\": retrieve existing data
  - \"interpret\": analyze, explain, or transform data
  - \"execute\": perform a side-effecting action

Reply with exactly:
{\"destination\": \"...\", \"consumer\": \"...\", \"semantics\": \"...\", \
\"confident\": true|false, \"reasoning\": \"one short sentence\"}

Set \"confident\" to false whenever the request is ambiguous.";

/// Wire shape of the model's structured output. Unknown axis values
/// fail deserialization, which is what makes them a parse error rather
/// than a default.
#[derive(Debug, Deserialize)]
struct ClassificationWire {
    destination: Destination,
    consumer: Consumer,
    semantics: Semantics,
    confident: bool,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Output of one classification call.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    /// The parsed classification.
    pub classification: Classification,
    /// The model that produced it, for the audit log.
    pub model: String,
    /// Raw rationale text, if the model gave one.
    pub rationale: Option<String>,
}

/// LLM-backed classifier over the 3x2x3 taxonomy.
pub struct Classifier {
    service: Arc<dyn InferenceService>,
    config: ClassifierConfig,
}

impl Classifier {
    /// Create a classifier over the given inference service.
    pub fn new(service: Arc<dyn InferenceService>, config: ClassifierConfig) -> Self {
        Self { service, config }
    }

    /// Classify a request, biased by the given correction exemplars.
    ///
    /// # Errors
    ///
    /// - [`TriadError::InferenceTimeout`] when the call exceeds the
    ///   configured deadline.
    /// - [`TriadError::InferenceFailure`] when the backend errors.
    /// - [`TriadError::ClassificationParse`] when the output cannot be
    ///   coerced to the taxonomy after one repair pass.
    pub async fn classify(
        &self,
        request: &str,
        corrections: &[CorrectionExemplar],
    ) -> Result<ClassificationResult> {
        let system = self.build_system_prompt(corrections);
        let options = InferenceOptions::json(self.config.timeout())
            .with_temperature(self.config.temperature)
            .with_top_p(self.config.top_p);

        let raw = complete_with_deadline(self.service.as_ref(), &system, request, &options)
            .await
            .map_err(TriadError::from)?;

        let wire = Self::parse_output(&raw)?;
        debug!(
            destination = %wire.destination,
            consumer = %wire.consumer,
            semantics = %wire.semantics,
            confident = wire.confident,
            "classified request"
        );

        let mut classification = Classification::new(
            wire.destination,
            wire.consumer,
            wire.semantics,
            wire.confident,
        );
        if let Some(reasoning) = &wire.reasoning {
            classification = classification.with_reasoning(reasoning.clone());
        }

        Ok(ClassificationResult {
            classification,
            model: self.service.model().to_string(),
            rationale: wire.reasoning,
        })
    }

    /// The full system prompt: taxonomy definition plus, when any
    /// exemplars are supplied, a `PAST CORRECTIONS` block contrasting
    /// what the system said with what the user corrected it to.
    pub fn build_system_prompt(&self, corrections: &[CorrectionExemplar]) -> String {
        let mut prompt = SYSTEM_PROMPT.to_string();
        if corrections.is_empty() {
            return prompt;
        }

        prompt.push_str("\n\nPAST CORRECTIONS (learn from these):\n");
        for ex in corrections {
            let _ = write!(
                prompt,
                "- \"{}\" was misclassified as {}/{}/{}; the user corrected it to {}/{}/{}",
                ex.request,
                ex.system_destination,
                ex.system_consumer,
                ex.system_semantics,
                ex.corrected_destination,
                ex.corrected_consumer,
                ex.corrected_semantics,
            );
            if ex.reasoning.is_empty() {
                prompt.push('\n');
            } else {
                let _ = writeln!(prompt, " ({})", ex.reasoning);
            }
        }
        prompt
    }

    /// Parse model output, repairing once before giving up.
    fn parse_output(raw: &str) -> Result<ClassificationWire> {
        match serde_json::from_str::<ClassificationWire>(raw) {
            Ok(wire) => Ok(wire),
            Err(first_err) => {
                warn!(%first_err, "classification output unparseable, attempting repair");
                serde_json::from_str::<ClassificationWire>(&repair_json(raw)).map_err(|err| {
                    TriadError::ClassificationParse {
                        detail: err.to_string(),
                        raw: raw.to_string(),
                    }
                })
            }
        }
    }
}
