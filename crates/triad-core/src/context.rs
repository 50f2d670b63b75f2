//! Classification context: correction exemplars for the classifier.
//!
//! A read-only view over the operation store. It serves recent
//! corrections so the classifier can bias toward previously-corrected
//! behavior, and reports whether any corrections exist at all. Writes
//! happen exclusively through the store's feedback-ingestion path.

use std::sync::Arc;

use triad_types::CorrectionExemplar;

use crate::store::OperationStore;

/// Default number of exemplars served when the caller has no opinion.
pub const DEFAULT_EXEMPLAR_LIMIT: usize = 5;

/// Read-only access to correction exemplars.
#[derive(Clone)]
pub struct ClassificationContext {
    store: Arc<dyn OperationStore>,
}

impl ClassificationContext {
    /// Create a context over the given store.
    pub fn new(store: Arc<dyn OperationStore>) -> Self {
        Self { store }
    }

    /// The most recent `limit` corrections, newest first. Any `limit`
    /// is valid, including zero. Never errors: no corrections is an
    /// empty sequence.
    pub fn get_corrections(&self, limit: usize) -> Vec<CorrectionExemplar> {
        self.store.recent_corrections(limit)
    }

    /// Whether at least one correction exists.
    pub fn has_corrections(&self) -> bool {
        self.store.has_corrections()
    }
}
