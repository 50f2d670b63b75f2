//! Operation store and feedback ingestion.
//!
//! [`OperationStore`] is the persistence capability the core consumes:
//! operations keyed by id, feedback keyed by id with a foreign
//! reference to its operation, and the correction exemplars derived
//! from feedback. Creates and appends are atomic with respect to
//! concurrent readers -- a reader never observes a partially-written
//! row, and reads reflect the most recent committed write.
//!
//! [`MemoryStore`] is the reference implementation, used directly in
//! production for single-process deployments and everywhere in tests.
//! A database-backed implementation plugs in behind the same trait.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use triad_types::{
    AgentId, AtomicOperation, Classification, ClassificationRecord, CorrectionExemplar,
    FeedbackType, OperationStatus, Result, TriadError, UserFeedback,
};

// ── Trait ───────────────────────────────────────────────────────────────

/// The persistence capability for operations and feedback.
///
/// This is the *only* writer of correction exemplars: the
/// classification context reads them back but never writes. All status
/// changes go through here so the state machine is enforced in one
/// place.
pub trait OperationStore: Send + Sync {
    /// Persist a new operation. Atomic: concurrent readers see either
    /// nothing or the whole row.
    fn create_operation(&self, operation: AtomicOperation) -> Result<()>;

    /// Fetch an operation by id.
    fn get_operation(&self, id: Uuid) -> Result<Option<AtomicOperation>>;

    /// Attach a classification and move the operation to `classified`.
    fn set_classification(&self, id: Uuid, classification: Classification) -> Result<()>;

    /// Record the routing decision and move the operation to `routed`.
    fn set_routed(&self, id: Uuid, agent: AgentId) -> Result<()>;

    /// Move the operation to `to`, enforcing the state machine.
    fn transition(&self, id: Uuid, to: OperationStatus) -> Result<()>;

    /// Append a feedback row. Rejects feedback for unknown operations.
    ///
    /// A correction additionally records an exemplar (visible to
    /// subsequent [`recent_corrections`](Self::recent_corrections)
    /// calls -- write-then-visible) and, when the operation is
    /// non-terminal, replaces its current classification and re-enters
    /// `classified`. Post-terminal corrections record only.
    fn store_feedback(&self, feedback: UserFeedback) -> Result<()>;

    /// All feedback rows for an operation, oldest first. History is
    /// retained even when superseded.
    fn feedback_for(&self, operation_id: Uuid) -> Result<Vec<UserFeedback>>;

    /// The most recent `limit` correction exemplars, newest first.
    /// Returns an empty vec (never an error) when none exist or when
    /// `limit` is zero.
    fn recent_corrections(&self, limit: usize) -> Vec<CorrectionExemplar>;

    /// Whether at least one correction exists. Consistent with
    /// `recent_corrections(1)` being non-empty.
    fn has_corrections(&self) -> bool;

    /// Append a classification audit record.
    fn log_classification(&self, record: ClassificationRecord) -> Result<()>;

    /// Audit records for an operation, oldest first.
    fn classification_log(&self, operation_id: Uuid) -> Vec<ClassificationRecord>;
}

// ── In-memory implementation ────────────────────────────────────────────

#[derive(Default)]
struct Inner {
    operations: HashMap<Uuid, AtomicOperation>,
    feedback: Vec<UserFeedback>,
    corrections: Vec<CorrectionExemplar>,
    log: Vec<ClassificationRecord>,
}

/// In-memory [`OperationStore`].
///
/// One `RwLock` over all tables keeps create/append trivially atomic;
/// critical sections are a few map operations, so readers and writers
/// only ever wait for committed work, never for in-flight I/O.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a status change to an operation already fetched under the
    /// write lock.
    fn apply_transition(op: &mut AtomicOperation, to: OperationStatus) -> Result<()> {
        if !op.status.can_transition(to) {
            return Err(TriadError::InvalidTransition {
                from: op.status,
                to,
            });
        }
        op.status = to;
        if to.is_terminal() {
            op.completed_at = Some(Utc::now());
        }
        Ok(())
    }
}

impl OperationStore for MemoryStore {
    fn create_operation(&self, operation: AtomicOperation) -> Result<()> {
        debug!(id = %operation.id, "create operation");
        self.inner.write().operations.insert(operation.id, operation);
        Ok(())
    }

    fn get_operation(&self, id: Uuid) -> Result<Option<AtomicOperation>> {
        Ok(self.inner.read().operations.get(&id).cloned())
    }

    fn set_classification(&self, id: Uuid, classification: Classification) -> Result<()> {
        let mut inner = self.inner.write();
        let op = inner
            .operations
            .get_mut(&id)
            .ok_or(TriadError::NotFound { operation_id: id })?;
        Self::apply_transition(op, OperationStatus::Classified)?;
        op.classification = Some(classification);
        Ok(())
    }

    fn set_routed(&self, id: Uuid, agent: AgentId) -> Result<()> {
        let mut inner = self.inner.write();
        let op = inner
            .operations
            .get_mut(&id)
            .ok_or(TriadError::NotFound { operation_id: id })?;
        Self::apply_transition(op, OperationStatus::Routed)?;
        op.routed_agent = Some(agent);
        Ok(())
    }

    fn transition(&self, id: Uuid, to: OperationStatus) -> Result<()> {
        let mut inner = self.inner.write();
        let op = inner
            .operations
            .get_mut(&id)
            .ok_or(TriadError::NotFound { operation_id: id })?;
        Self::apply_transition(op, to)
    }

    fn store_feedback(&self, feedback: UserFeedback) -> Result<()> {
        let mut inner = self.inner.write();

        let Some(op) = inner.operations.get(&feedback.operation_id).cloned() else {
            return Err(TriadError::NotFound {
                operation_id: feedback.operation_id,
            });
        };

        if feedback.feedback_type == FeedbackType::Correction {
            // An axis the user left unset means the system value stood.
            // Without a system classification there is nothing to
            // contrast, so no exemplar is recorded.
            if let Some(system) = op.classification.clone() {
                let corrected = Classification::new(
                    feedback.corrected_destination.unwrap_or(system.destination),
                    feedback.corrected_consumer.unwrap_or(system.consumer),
                    feedback.corrected_semantics.unwrap_or(system.semantics),
                    true,
                );

                inner.corrections.push(CorrectionExemplar {
                    request: op.user_request.clone(),
                    system_destination: system.destination,
                    system_consumer: system.consumer,
                    system_semantics: system.semantics,
                    corrected_destination: corrected.destination,
                    corrected_consumer: corrected.consumer,
                    corrected_semantics: corrected.semantics,
                    reasoning: feedback
                        .correction_reasoning
                        .clone()
                        .unwrap_or_default(),
                    recorded_at: feedback.created_at,
                });

                if !op.status.is_terminal()
                    && let Some(live) = inner.operations.get_mut(&feedback.operation_id)
                {
                    debug!(id = %live.id, "correction re-enters classified");
                    Self::apply_transition(live, OperationStatus::Classified)?;
                    live.classification = Some(
                        corrected.with_reasoning(
                            feedback
                                .correction_reasoning
                                .clone()
                                .unwrap_or_default(),
                        ),
                    );
                }
            }
        }

        inner.feedback.push(feedback);
        Ok(())
    }

    fn feedback_for(&self, operation_id: Uuid) -> Result<Vec<UserFeedback>> {
        Ok(self
            .inner
            .read()
            .feedback
            .iter()
            .filter(|fb| fb.operation_id == operation_id)
            .cloned()
            .collect())
    }

    fn recent_corrections(&self, limit: usize) -> Vec<CorrectionExemplar> {
        self.inner
            .read()
            .corrections
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    fn has_corrections(&self) -> bool {
        !self.inner.read().corrections.is_empty()
    }

    fn log_classification(&self, record: ClassificationRecord) -> Result<()> {
        self.inner.write().log.push(record);
        Ok(())
    }

    fn classification_log(&self, operation_id: Uuid) -> Vec<ClassificationRecord> {
        self.inner
            .read()
            .log
            .iter()
            .filter(|r| r.operation_id == operation_id)
            .cloned()
            .collect()
    }
}
