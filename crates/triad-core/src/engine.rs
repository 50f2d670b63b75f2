//! The engine: classify -> route -> verify -> learn in one place.
//!
//! Owns the store, classifier, router, and verification pipeline, and
//! drives the operation state machine:
//!
//! ```text
//! created -> classified -> routed -> verifying -> approved
//!                                              -> rejected   (safety failure)
//!                                              -> escalated  (non-fatal failures)
//! ```
//!
//! The engine is also where two caller policies live, explicit and
//! testable: the rate-limit gate is consulted before any inference
//! call, and a classifier parse error is (optionally) substituted with
//! the conservative low-confidence classification so the request lands
//! on the human fallback path instead of failing the whole operation.

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use triad_llm::InferenceService;
use triad_types::{
    AtomicOperation, Classification, ClassificationRecord, Consumer, CorrectionExemplar,
    Destination, OperationStatus, Result, Semantics, TriadError, UserFeedback,
};

use crate::classifier::{ClassificationResult, Classifier};
use crate::config::TriadConfig;
use crate::context::ClassificationContext;
use crate::router::{RequestRouter, RouteDecision};
use crate::store::OperationStore;
use crate::verify::{
    ObservedEffects, PipelineMode, PipelineResult, ProposedAction, VerificationContext,
    VerificationPipeline,
};

/// The rate-limiting capability, consumed from outside this core.
///
/// `allow` is consulted before the classifier's inference call; a
/// refusal surfaces as [`TriadError::RateLimitExceeded`] without the
/// backend ever being contacted.
pub trait RateGate: Send + Sync {
    /// Whether a request from `user_id` may proceed right now.
    fn allow(&self, user_id: &str) -> bool;
}

/// The triage engine.
pub struct Engine {
    store: Arc<dyn OperationStore>,
    context: ClassificationContext,
    classifier: Classifier,
    router: RequestRouter,
    pipeline: VerificationPipeline,
    rate_gate: Option<Arc<dyn RateGate>>,
    config: TriadConfig,
}

impl Engine {
    /// Build an engine over a store and an inference service. The same
    /// service backs the classifier and the intent judge; they are the
    /// only two inference call sites.
    pub fn new(
        store: Arc<dyn OperationStore>,
        inference: Arc<dyn InferenceService>,
        config: TriadConfig,
    ) -> Self {
        Self {
            context: ClassificationContext::new(store.clone()),
            classifier: Classifier::new(inference.clone(), config.classifier.clone()),
            router: RequestRouter::new(),
            pipeline: VerificationPipeline::new(inference, config.pipeline.clone()),
            rate_gate: None,
            store,
            config,
        }
    }

    /// Attach a rate-limit gate.
    pub fn with_rate_gate(mut self, gate: Arc<dyn RateGate>) -> Self {
        self.rate_gate = Some(gate);
        self
    }

    /// Replace the router (e.g. with a custom table).
    pub fn with_router(mut self, router: RequestRouter) -> Self {
        self.router = router;
        self
    }

    /// The underlying store, for read access by the transport layer.
    pub fn store(&self) -> &Arc<dyn OperationStore> {
        &self.store
    }

    // ── Classification ──────────────────────────────────────────────

    /// Classify a request for `user_id`, biased by recent corrections.
    ///
    /// Checks the rate gate first; a refusal is
    /// [`TriadError::RateLimitExceeded`], distinct from any inference
    /// failure, and no inference call is attempted.
    pub async fn classify(&self, request: &str, user_id: &str) -> Result<ClassificationResult> {
        if let Some(gate) = &self.rate_gate
            && !gate.allow(user_id)
        {
            return Err(TriadError::RateLimitExceeded {
                user_id: user_id.to_string(),
            });
        }

        let corrections = self
            .context
            .get_corrections(self.config.classifier.exemplar_limit);
        self.classifier.classify(request, &corrections).await
    }

    /// Route a classification to its target agent.
    pub fn route(&self, classification: &Classification) -> Result<RouteDecision> {
        self.router.route(classification)
    }

    /// Recent correction exemplars, newest first.
    pub fn get_corrections(&self, limit: usize) -> Vec<CorrectionExemplar> {
        self.context.get_corrections(limit)
    }

    // ── Operation lifecycle ─────────────────────────────────────────

    /// Create, classify, and route an operation for a request.
    ///
    /// On success the operation is in `routed` with its classification
    /// and target agent recorded. A classifier parse error is replaced
    /// with the conservative low-confidence classification when
    /// `engine.parse_error_fallback` is set (the default), which lands
    /// the request on the conversation fallback for manual
    /// disambiguation. Every other error leaves the operation in
    /// `created` and surfaces unchanged.
    pub async fn process_request(&self, request: &str, user_id: &str) -> Result<AtomicOperation> {
        let operation = AtomicOperation::new(request, user_id);
        let id = operation.id;
        self.store.create_operation(operation)?;

        let classification = match self.classify(request, user_id).await {
            Ok(result) => {
                self.store.log_classification(ClassificationRecord::new(
                    id,
                    result.classification.clone(),
                    result.model.clone(),
                ))?;
                result.classification
            }
            Err(TriadError::ClassificationParse { detail, .. })
                if self.config.engine.parse_error_fallback =>
            {
                warn!(%detail, "classifier output unparseable, taking manual disambiguation path");
                Classification::new(
                    Destination::Stream,
                    Consumer::Human,
                    Semantics::Interpret,
                    false,
                )
            }
            Err(err) => return Err(err),
        };

        self.store.set_classification(id, classification.clone())?;

        let decision = self.router.route(&classification)?;
        debug!(agent = %decision.agent, fallback = decision.fallback, "routed operation");
        self.store.set_routed(id, decision.agent)?;

        self.fetch(id)
    }

    /// Run the verification pipeline for an operation's proposed
    /// action, using the configured default mode, and apply the
    /// disposition.
    pub async fn verify(
        &self,
        operation_id: Uuid,
        action: ProposedAction,
        observed: ObservedEffects,
    ) -> Result<PipelineResult> {
        self.run_verification(operation_id, action, observed, self.config.pipeline.mode)
            .await
    }

    /// Run the verification pipeline in an explicit mode and apply the
    /// disposition: approval -> `approved`; rejection with a safety
    /// failure -> `rejected`; rejection from non-fatal failures only ->
    /// `escalated`, awaiting manual review.
    pub async fn run_verification(
        &self,
        operation_id: Uuid,
        action: ProposedAction,
        observed: ObservedEffects,
        mode: PipelineMode,
    ) -> Result<PipelineResult> {
        let operation = self
            .store
            .get_operation(operation_id)?
            .ok_or(TriadError::NotFound { operation_id })?;

        self.store.transition(operation_id, OperationStatus::Verifying)?;

        let ctx = VerificationContext {
            operation,
            action,
            observed,
        };
        let result = self.pipeline.run(&ctx, mode).await;

        let disposition = if result.approved {
            OperationStatus::Approved
        } else if result.safety_failed() {
            OperationStatus::Rejected
        } else {
            OperationStatus::Escalated
        };
        debug!(
            id = %operation_id,
            approved = result.approved,
            ?disposition,
            "verification finished"
        );
        self.store.transition(operation_id, disposition)?;

        Ok(result)
    }

    /// Resolve an escalated operation after manual review.
    pub fn resolve_escalation(&self, operation_id: Uuid, approve: bool) -> Result<()> {
        let to = if approve {
            OperationStatus::Approved
        } else {
            OperationStatus::Rejected
        };
        self.store.transition(operation_id, to)
    }

    /// Record user feedback. Corrections become exemplars for future
    /// classifications; see [`OperationStore::store_feedback`].
    pub fn record_feedback(&self, feedback: UserFeedback) -> Result<()> {
        self.store.store_feedback(feedback)
    }

    fn fetch(&self, operation_id: Uuid) -> Result<AtomicOperation> {
        self.store
            .get_operation(operation_id)?
            .ok_or(TriadError::NotFound { operation_id })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::store::MemoryStore;
    use triad_llm::testing::CannedInference;
    use triad_types::AgentId;

    const GREETING_RESPONSE: &str = r#"{"destination": "stream", "consumer": "human",
        "semantics": "interpret", "confident": true, "reasoning": "greeting"}"#;

    fn engine_with(response: &str) -> Engine {
        Engine::new(
            Arc::new(MemoryStore::new()),
            Arc::new(CannedInference::returning(response)),
            TriadConfig::default(),
        )
    }

    struct ClosedGate(AtomicBool);

    impl RateGate for ClosedGate {
        fn allow(&self, _user_id: &str) -> bool {
            self.0.load(Ordering::Relaxed)
        }
    }

    #[tokio::test]
    async fn process_request_classifies_and_routes() {
        let engine = engine_with(GREETING_RESPONSE);
        let op = engine.process_request("good morning", "user-1").await.unwrap();

        assert_eq!(op.status, OperationStatus::Routed);
        assert_eq!(op.routed_agent, Some(AgentId::Conversation));
        let c = op.classification.unwrap();
        assert!(c.confident);
        assert_eq!(c.triple(), "stream/human/interpret");
    }

    #[tokio::test]
    async fn process_request_logs_the_classification() {
        let engine = engine_with(GREETING_RESPONSE);
        let op = engine.process_request("good morning", "user-1").await.unwrap();

        let log = engine.store().classification_log(op.id);
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].model, "canned-model");
    }

    #[tokio::test]
    async fn closed_gate_refuses_before_any_inference() {
        let inference = Arc::new(CannedInference::returning(GREETING_RESPONSE));
        let engine = Engine::new(
            Arc::new(MemoryStore::new()),
            inference.clone(),
            TriadConfig::default(),
        )
        .with_rate_gate(Arc::new(ClosedGate(AtomicBool::new(false))));

        let err = engine.classify("good morning", "user-1").await.unwrap_err();
        assert!(matches!(err, TriadError::RateLimitExceeded { .. }));
        assert_eq!(inference.call_count(), 0, "backend never contacted");
    }

    #[tokio::test]
    async fn open_gate_lets_requests_through() {
        let engine = engine_with(GREETING_RESPONSE)
            .with_rate_gate(Arc::new(ClosedGate(AtomicBool::new(true))));
        assert!(engine.classify("good morning", "user-1").await.is_ok());
    }

    #[tokio::test]
    async fn parse_error_takes_the_manual_disambiguation_path() {
        let engine = engine_with("not json at all");
        let op = engine.process_request("gibberish request", "user-1").await.unwrap();

        assert_eq!(op.status, OperationStatus::Routed);
        assert_eq!(op.routed_agent, Some(AgentId::Conversation));
        let c = op.classification.unwrap();
        assert!(!c.confident);
        assert_eq!(c.destination, Destination::Stream);
        // Nothing was classified, so nothing was logged.
        assert!(engine.store().classification_log(op.id).is_empty());
    }

    #[tokio::test]
    async fn parse_error_surfaces_when_fallback_disabled() {
        let config = TriadConfig {
            engine: crate::config::EngineConfig {
                parse_error_fallback: false,
            },
            ..TriadConfig::default()
        };
        let engine = Engine::new(
            Arc::new(MemoryStore::new()),
            Arc::new(CannedInference::returning("not json at all")),
            config,
        );
        let err = engine
            .process_request("gibberish request", "user-1")
            .await
            .unwrap_err();
        assert!(matches!(err, TriadError::ClassificationParse { .. }));
    }

    #[tokio::test]
    async fn approved_verification_terminates_the_operation() {
        // The canned service answers the classifier and the judge with
        // the same JSON; extra fields make it valid for both shapes.
        let engine = engine_with(
            r#"{"destination": "stream", "consumer": "human", "semantics": "read",
                "confident": true, "judgment": "aligned", "rationale": "ok"}"#,
        );
        let op = engine.process_request("show git status", "user-1").await.unwrap();

        let action = ProposedAction::new("display repository status").with_output("clean tree");
        let result = engine
            .verify(op.id, action, ObservedEffects::default())
            .await
            .unwrap();

        assert!(result.approved);
        let loaded = engine.store().get_operation(op.id).unwrap().unwrap();
        assert_eq!(loaded.status, OperationStatus::Approved);
        assert!(loaded.completed_at.is_some());
    }

    #[tokio::test]
    async fn safety_failure_rejects_outright() {
        let engine = engine_with(
            r#"{"destination": "process", "consumer": "machine", "semantics": "execute",
                "confident": true, "judgment": "aligned", "rationale": "ok"}"#,
        );
        let op = engine.process_request("clean the disk", "user-1").await.unwrap();

        let action = ProposedAction::new("wipe everything").with_command("rm -rf /");
        let result = engine
            .verify(op.id, action, ObservedEffects::default())
            .await
            .unwrap();

        assert!(!result.approved);
        assert!(result.safety_failed());
        let loaded = engine.store().get_operation(op.id).unwrap().unwrap();
        assert_eq!(loaded.status, OperationStatus::Rejected);
    }

    #[tokio::test]
    async fn non_fatal_rejection_escalates_then_resolves() {
        let engine = engine_with(
            r#"{"destination": "file", "consumer": "human", "semantics": "execute",
                "confident": true, "judgment": "misaligned", "rationale": "wrong file"}"#,
        );
        let op = engine.process_request("save my notes", "user-1").await.unwrap();

        // Syntax fails (claimed-but-empty output), semantic fails (no
        // declared file effects), and the judge says misaligned: two
        // passes in lenient mode is below threshold, with no safety
        // failure.
        let action = ProposedAction::new("write somewhere").with_output("");
        let result = engine
            .verify(op.id, action, ObservedEffects::default())
            .await
            .unwrap();

        assert!(!result.approved);
        assert!(!result.safety_failed());
        let loaded = engine.store().get_operation(op.id).unwrap().unwrap();
        assert_eq!(loaded.status, OperationStatus::Escalated);

        engine.resolve_escalation(op.id, true).unwrap();
        let loaded = engine.store().get_operation(op.id).unwrap().unwrap();
        assert_eq!(loaded.status, OperationStatus::Approved);
    }

    #[tokio::test]
    async fn verifying_unknown_operation_is_not_found() {
        let engine = engine_with(GREETING_RESPONSE);
        let err = engine
            .verify(
                Uuid::new_v4(),
                ProposedAction::new("anything"),
                ObservedEffects::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TriadError::NotFound { .. }));
    }

    #[tokio::test]
    async fn feedback_on_unknown_operation_is_not_found() {
        let engine = engine_with(GREETING_RESPONSE);
        let err = engine
            .record_feedback(UserFeedback::confirmation(Uuid::new_v4(), "user-1"))
            .unwrap_err();
        assert!(matches!(err, TriadError::NotFound { .. }));
    }
}
