//! Atomic operations, their status machine, and feedback records.
//!
//! An [`AtomicOperation`] is the unit of work: one user request, one
//! current classification, one disposition. Operations are owned by the
//! operation store for their entire lifetime and are never mutated
//! outside the store's API.
//!
//! [`UserFeedback`] records a human override of a classification.
//! Feedback is append-only: it is never edited or deleted, only
//! superseded by newer feedback on the same operation. Corrections
//! additionally become [`CorrectionExemplar`]s served to the classifier
//! as few-shot examples.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::routing::AgentId;
use crate::taxonomy::{Classification, Consumer, Destination, Semantics};

// ── Operation status ────────────────────────────────────────────────────

/// Lifecycle states of an atomic operation.
///
/// ```text
/// created -> classified -> routed -> verifying -> approved
///                                              -> rejected
///                                              -> escalated -> approved | rejected
/// ```
///
/// `approved` and `rejected` are terminal. A correction re-enters
/// `classified` from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    /// Operation exists, classification pending.
    Created,
    /// A current classification is attached.
    Classified,
    /// A target agent has been selected.
    Routed,
    /// The verification pipeline is running.
    Verifying,
    /// Verification approved the action. Terminal.
    Approved,
    /// Verification (or manual review) rejected the action. Terminal.
    Rejected,
    /// Verification could not decide; awaiting manual review.
    Escalated,
}

impl OperationStatus {
    /// Whether this state admits no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, OperationStatus::Approved | OperationStatus::Rejected)
    }

    /// Whether the state machine permits moving from `self` to `to`.
    ///
    /// The `* -> classified` edges from non-terminal states are the
    /// correction re-entry path.
    pub fn can_transition(self, to: OperationStatus) -> bool {
        use OperationStatus::*;
        matches!(
            (self, to),
            (Created, Classified)
                | (Classified, Routed)
                | (Routed, Verifying)
                | (Verifying, Approved)
                | (Verifying, Rejected)
                | (Verifying, Escalated)
                | (Escalated, Approved)
                | (Escalated, Rejected)
                | (Classified, Classified)
                | (Routed, Classified)
                | (Verifying, Classified)
                | (Escalated, Classified)
        )
    }
}

// ── Atomic operation ────────────────────────────────────────────────────

/// A single atomic operation -- the core unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomicOperation {
    /// Unique operation id.
    pub id: Uuid,

    /// The raw natural-language request.
    pub user_request: String,

    /// The user or session the request came from.
    pub user_id: String,

    /// The *current* classification: the original, or the latest
    /// correction-derived one. `None` only in `created`.
    pub classification: Option<Classification>,

    /// Current lifecycle state.
    pub status: OperationStatus,

    /// The agent selected by the router, once routed.
    pub routed_agent: Option<AgentId>,

    /// When the operation was created.
    pub created_at: DateTime<Utc>,

    /// When the operation reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
}

impl AtomicOperation {
    /// Create a fresh operation in `created`, classification pending.
    pub fn new(user_request: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_request: user_request.into(),
            user_id: user_id.into(),
            classification: None,
            status: OperationStatus::Created,
            routed_agent: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

// ── Feedback ────────────────────────────────────────────────────────────

/// Kinds of user feedback on an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackType {
    /// The user fixed a wrong classification.
    Correction,
    /// The user confirmed the classification was right.
    Confirmation,
}

/// A human override or confirmation of a classification.
///
/// For corrections, an axis left as `None` means "the system value was
/// right for this axis"; the store fills it from the operation's
/// classification when building the exemplar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserFeedback {
    /// Unique feedback id.
    pub id: Uuid,

    /// The operation this feedback refers to.
    pub operation_id: Uuid,

    /// The user giving the feedback.
    pub user_id: String,

    /// Correction or confirmation.
    pub feedback_type: FeedbackType,

    /// Corrected destination, if the user changed it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrected_destination: Option<Destination>,

    /// Corrected consumer, if the user changed it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrected_consumer: Option<Consumer>,

    /// Corrected semantics, if the user changed it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrected_semantics: Option<Semantics>,

    /// The user's explanation of the correction, kept verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correction_reasoning: Option<String>,

    /// When the feedback was recorded.
    pub created_at: DateTime<Utc>,
}

impl UserFeedback {
    /// Build a correction for an operation.
    pub fn correction(
        operation_id: Uuid,
        user_id: impl Into<String>,
        destination: Option<Destination>,
        consumer: Option<Consumer>,
        semantics: Option<Semantics>,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            operation_id,
            user_id: user_id.into(),
            feedback_type: FeedbackType::Correction,
            corrected_destination: destination,
            corrected_consumer: consumer,
            corrected_semantics: semantics,
            correction_reasoning: Some(reasoning.into()),
            created_at: Utc::now(),
        }
    }

    /// Build a confirmation for an operation.
    pub fn confirmation(operation_id: Uuid, user_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            operation_id,
            user_id: user_id.into(),
            feedback_type: FeedbackType::Confirmation,
            corrected_destination: None,
            corrected_consumer: None,
            corrected_semantics: None,
            correction_reasoning: None,
            created_at: Utc::now(),
        }
    }
}

// ── Exemplars and audit records ─────────────────────────────────────────

/// A stored correction served to the classifier as a few-shot example.
///
/// Carries both what the system said and what the user corrected it to,
/// so the classifier prompt can show the contrast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionExemplar {
    /// The original request text.
    pub request: String,

    /// What the system classified the destination as.
    pub system_destination: Destination,
    /// What the system classified the consumer as.
    pub system_consumer: Consumer,
    /// What the system classified the semantics as.
    pub system_semantics: Semantics,

    /// The user-corrected destination.
    pub corrected_destination: Destination,
    /// The user-corrected consumer.
    pub corrected_consumer: Consumer,
    /// The user-corrected semantics.
    pub corrected_semantics: Semantics,

    /// The user's reasoning, verbatim.
    pub reasoning: String,

    /// When the correction was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// Audit record of a single classifier invocation.
///
/// Serving APIs never read these; they exist so every classification --
/// original or correction-derived -- can be traced to the model that
/// produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRecord {
    /// Unique record id.
    pub id: Uuid,

    /// The operation that was classified.
    pub operation_id: Uuid,

    /// The classification that was produced.
    pub classification: Classification,

    /// The model name reported by the inference service.
    pub model: String,

    /// When the classification happened.
    pub recorded_at: DateTime<Utc>,
}

impl ClassificationRecord {
    /// Build an audit record for one classifier invocation.
    pub fn new(operation_id: Uuid, classification: Classification, model: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            operation_id,
            classification,
            model: model.into(),
            recorded_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_operation_starts_created() {
        let op = AtomicOperation::new("show memory usage", "user-1");
        assert_eq!(op.status, OperationStatus::Created);
        assert!(op.classification.is_none());
        assert!(op.routed_agent.is_none());
        assert!(op.completed_at.is_none());
    }

    #[test]
    fn happy_path_transitions_allowed() {
        use OperationStatus::*;
        assert!(Created.can_transition(Classified));
        assert!(Classified.can_transition(Routed));
        assert!(Routed.can_transition(Verifying));
        assert!(Verifying.can_transition(Approved));
        assert!(Verifying.can_transition(Rejected));
        assert!(Verifying.can_transition(Escalated));
        assert!(Escalated.can_transition(Approved));
        assert!(Escalated.can_transition(Rejected));
    }

    #[test]
    fn correction_reentry_from_non_terminal_states() {
        use OperationStatus::*;
        for from in [Classified, Routed, Verifying, Escalated] {
            assert!(from.can_transition(Classified), "{from:?} -> classified");
        }
    }

    #[test]
    fn terminal_states_admit_nothing() {
        use OperationStatus::*;
        for to in [Created, Classified, Routed, Verifying, Approved, Rejected, Escalated] {
            assert!(!Approved.can_transition(to));
            assert!(!Rejected.can_transition(to));
        }
    }

    #[test]
    fn backwards_transitions_rejected() {
        use OperationStatus::*;
        assert!(!Verifying.can_transition(Created));
        assert!(!Routed.can_transition(Created));
        assert!(!Classified.can_transition(Verifying));
    }

    #[test]
    fn is_terminal() {
        assert!(OperationStatus::Approved.is_terminal());
        assert!(OperationStatus::Rejected.is_terminal());
        assert!(!OperationStatus::Escalated.is_terminal());
        assert!(!OperationStatus::Created.is_terminal());
    }

    #[test]
    fn correction_constructor_sets_type_and_reasoning() {
        let op_id = Uuid::new_v4();
        let fb = UserFeedback::correction(
            op_id,
            "user-1",
            Some(Destination::Stream),
            Some(Consumer::Human),
            Some(Semantics::Interpret),
            "wrong classification",
        );
        assert_eq!(fb.feedback_type, FeedbackType::Correction);
        assert_eq!(fb.operation_id, op_id);
        assert_eq!(fb.correction_reasoning.as_deref(), Some("wrong classification"));
    }

    #[test]
    fn confirmation_constructor_carries_no_triple() {
        let fb = UserFeedback::confirmation(Uuid::new_v4(), "user-1");
        assert_eq!(fb.feedback_type, FeedbackType::Confirmation);
        assert!(fb.corrected_destination.is_none());
        assert!(fb.corrected_consumer.is_none());
        assert!(fb.corrected_semantics.is_none());
        assert!(fb.correction_reasoning.is_none());
    }

    #[test]
    fn operation_serde_roundtrip() {
        let mut op = AtomicOperation::new("run pytest", "user-2");
        op.classification = Some(Classification::new(
            Destination::Process,
            Consumer::Machine,
            Semantics::Execute,
            true,
        ));
        let json = serde_json::to_string(&op).unwrap();
        let restored: AtomicOperation = serde_json::from_str(&json).unwrap();
        assert_eq!(op, restored);
    }
}
