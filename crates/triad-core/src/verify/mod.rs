//! The five-stage verification pipeline.
//!
//! A proposed (or already-executed) action is checked by five
//! independent verifiers in a fixed order:
//!
//! 1. **[`SyntaxVerifier`]** -- structural validity of the action payload
//! 2. **[`SemanticVerifier`]** -- internal consistency with the classification
//! 3. **[`BehavioralVerifier`]** -- observed effects match declared effects
//! 4. **[`SafetyVerifier`]** -- hard gate on destructive actions (fatal)
//! 5. **[`IntentVerifier`]** -- inference-backed alignment judgment
//!
//! Stages never reorder. A fatal failure (Safety, by design the only
//! fatal stage) halts the run: later stages are recorded as skipped --
//! they never start. In strict mode any failure halts; in lenient mode
//! non-fatal failures are recorded and the run continues. Verifiers
//! receive only the [`VerificationContext`] and return a result object;
//! they never mutate the operation.

pub mod behavioral;
pub mod intent;
pub mod safety;
pub mod semantic;
pub mod syntax;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use triad_llm::InferenceService;
use triad_types::AtomicOperation;

use crate::config::PipelineConfig;

pub use behavioral::BehavioralVerifier;
pub use intent::{IntentJudgment, IntentVerifier};
pub use safety::SafetyVerifier;
pub use semantic::SemanticVerifier;
pub use syntax::SyntaxVerifier;

// ── Stages and outcomes ─────────────────────────────────────────────────

/// The five pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Structural validity of the action payload.
    Syntax,
    /// Internal consistency with the operation's classification.
    Semantic,
    /// Observed effects match declared effects.
    Behavioral,
    /// Hard gate on destructive or policy-violating actions.
    Safety,
    /// Inference-backed judgment of alignment with the request.
    Intent,
}

impl Stage {
    /// The wire/display name of this stage.
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Syntax => "syntax",
            Stage::Semantic => "semantic",
            Stage::Behavioral => "behavioral",
            Stage::Safety => "safety",
            Stage::Intent => "intent",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// The stage examined the action and found no problem.
    Pass,
    /// The stage examined the action and found a problem.
    Fail,
    /// The stage never ran (earlier halt) or could not examine the
    /// action (its own infrastructure failed). Never a content verdict.
    Skipped,
}

/// A single stage's recorded result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    /// Which stage produced this result.
    pub stage: Stage,
    /// Pass, fail, or skipped.
    pub status: StageStatus,
    /// What the stage found, or why it was skipped.
    pub message: String,
}

impl StageResult {
    /// A passing result.
    pub fn pass(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            status: StageStatus::Pass,
            message: message.into(),
        }
    }

    /// A failing result.
    pub fn fail(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            status: StageStatus::Fail,
            message: message.into(),
        }
    }

    /// A skipped result, with the reason it never ran.
    pub fn skipped(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            status: StageStatus::Skipped,
            message: message.into(),
        }
    }
}

/// Aggregation policy for the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineMode {
    /// Every executed stage must pass; any failure halts the run.
    Strict,
    /// Safety must pass, plus a configured minimum of passing stages;
    /// non-fatal failures do not halt the run.
    Lenient,
}

// ── Action and context ──────────────────────────────────────────────────

/// The action a target agent proposes (or has executed) for an
/// operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProposedAction {
    /// Human-readable description of what the action does.
    pub summary: String,

    /// Structured action body.
    pub payload: serde_json::Value,

    /// Shell command, for process-destination actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Files the action declares it will read.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_reads: Vec<String>,

    /// Files the action declares it will create or modify.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_writes: Vec<String>,

    /// Generated output text, for stream-destination actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_text: Option<String>,
}

impl ProposedAction {
    /// An action with a summary and an empty object payload.
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            payload: serde_json::Value::Object(serde_json::Map::new()),
            ..Self::default()
        }
    }

    /// Set the structured payload.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Declare a shell command.
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Declare a file read.
    pub fn with_file_read(mut self, path: impl Into<String>) -> Self {
        self.file_reads.push(path.into());
        self
    }

    /// Declare a file write.
    pub fn with_file_write(mut self, path: impl Into<String>) -> Self {
        self.file_writes.push(path.into());
        self
    }

    /// Attach generated output text.
    pub fn with_output(mut self, text: impl Into<String>) -> Self {
        self.output_text = Some(text.into());
        self
    }
}

/// Effects actually observed while simulating or executing the action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservedEffects {
    /// Files observed created or modified.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub writes: Vec<String>,

    /// Processes observed spawned.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spawns: Vec<String>,
}

/// Everything a verifier may look at. Built per run, never persisted.
#[derive(Debug, Clone)]
pub struct VerificationContext {
    /// The operation being verified.
    pub operation: AtomicOperation,
    /// The proposed or executed action.
    pub action: ProposedAction,
    /// Environment facts observed so far.
    pub observed: ObservedEffects,
}

// ── Verifier trait ──────────────────────────────────────────────────────

/// One pipeline stage.
///
/// Verifiers are read-only: they receive the context and return a
/// result; the pipeline aggregates. A verifier whose own dependency
/// fails reports [`StageStatus::Skipped`] with the error in the
/// message, never a content failure.
#[async_trait]
pub trait Verifier: Send + Sync {
    /// Which stage this verifier implements.
    fn stage(&self) -> Stage;

    /// Whether a failure of this stage halts the run unconditionally.
    /// Only Safety is fatal by design.
    fn fatal(&self) -> bool {
        false
    }

    /// Examine the context and produce a result.
    async fn verify(&self, ctx: &VerificationContext) -> StageResult;
}

// ── Pipeline ────────────────────────────────────────────────────────────

/// Result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Per-stage outcomes, in execution order.
    pub stages: Vec<StageResult>,
    /// The aggregate verdict.
    pub approved: bool,
    /// The mode the run used.
    pub mode: PipelineMode,
}

impl PipelineResult {
    /// The recorded result for a stage, if the pipeline has one.
    pub fn stage(&self, stage: Stage) -> Option<&StageResult> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    /// How many stages passed.
    pub fn passes(&self) -> usize {
        self.stages
            .iter()
            .filter(|s| s.status == StageStatus::Pass)
            .count()
    }

    /// Whether the Safety stage ran and failed.
    pub fn safety_failed(&self) -> bool {
        self.stage(Stage::Safety)
            .is_some_and(|s| s.status == StageStatus::Fail)
    }
}

/// Runs the ordered verifier sequence and aggregates a verdict.
pub struct VerificationPipeline {
    verifiers: Vec<Arc<dyn Verifier>>,
    config: PipelineConfig,
}

impl VerificationPipeline {
    /// The standard five-stage pipeline. `judge` is the inference
    /// service backing the intent stage -- the only stage allowed to
    /// consult it.
    pub fn new(judge: Arc<dyn InferenceService>, config: PipelineConfig) -> Self {
        let verifiers: Vec<Arc<dyn Verifier>> = vec![
            Arc::new(SyntaxVerifier),
            Arc::new(SemanticVerifier),
            Arc::new(BehavioralVerifier),
            Arc::new(SafetyVerifier::new()),
            Arc::new(IntentVerifier::new(judge, config.judge_timeout())),
        ];
        Self { verifiers, config }
    }

    /// A pipeline over a caller-supplied verifier sequence, in the
    /// given order. Test seam.
    pub fn with_verifiers(verifiers: Vec<Arc<dyn Verifier>>, config: PipelineConfig) -> Self {
        Self { verifiers, config }
    }

    /// Run every stage in order and aggregate the verdict.
    pub async fn run(&self, ctx: &VerificationContext, mode: PipelineMode) -> PipelineResult {
        let mut stages = Vec::with_capacity(self.verifiers.len());
        let mut halted: Option<String> = None;

        for verifier in &self.verifiers {
            if let Some(reason) = &halted {
                stages.push(StageResult::skipped(verifier.stage(), reason.clone()));
                continue;
            }

            let result = verifier.verify(ctx).await;
            debug!(stage = %result.stage, status = ?result.status, "verifier stage finished");

            let failed = result.status == StageStatus::Fail;
            stages.push(result);

            if failed {
                if verifier.fatal() {
                    halted = Some(format!("not evaluated: fatal {} failure", verifier.stage()));
                } else if mode == PipelineMode::Strict {
                    halted = Some(format!(
                        "not evaluated: {} failed in strict mode",
                        verifier.stage()
                    ));
                }
            }
        }

        let approved = self.aggregate(&stages, mode);
        PipelineResult {
            stages,
            approved,
            mode,
        }
    }

    fn aggregate(&self, stages: &[StageResult], mode: PipelineMode) -> bool {
        match mode {
            PipelineMode::Strict => stages.iter().all(|s| s.status == StageStatus::Pass),
            PipelineMode::Lenient => {
                let safety_passed = stages
                    .iter()
                    .any(|s| s.stage == Stage::Safety && s.status == StageStatus::Pass);
                let passes = stages
                    .iter()
                    .filter(|s| s.status == StageStatus::Pass)
                    .count();
                safety_passed && passes >= self.config.min_passes
            }
        }
    }
}
