//! Explicit method dispatch for the transport layer.
//!
//! The transport (JSON-RPC or otherwise) lives outside this core; what
//! it needs from the core is a table from method name to handler. The
//! table is plain data built once at process start and read-only
//! afterwards -- no decorator magic, no process-wide mutable registry.
//! Handlers come in exactly two shapes, as concrete function-pointer
//! types: those that need the operation store and those that do not.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use triad_types::{AgentId, Consumer, Destination, Result, Semantics, TriadError, UserFeedback};

use crate::store::OperationStore;

/// A handler that reads or writes through the operation store.
pub type StoreHandler = fn(&dyn OperationStore, Value) -> Result<Value>;

/// A handler that needs nothing but its parameters.
pub type StatelessHandler = fn(Value) -> Result<Value>;

/// The two handler shapes.
#[derive(Clone, Copy)]
pub enum Handler {
    /// Needs a persistence handle.
    WithStore(StoreHandler),
    /// Pure function of its parameters.
    Stateless(StatelessHandler),
}

/// The method table: name -> handler, built once, read-only afterwards.
pub struct MethodTable {
    methods: HashMap<&'static str, Handler>,
}

impl MethodTable {
    /// Build the table with the built-in methods registered.
    pub fn new() -> Self {
        let mut methods: HashMap<&'static str, Handler> = HashMap::new();
        methods.insert("operations/get", Handler::WithStore(operations_get));
        methods.insert("corrections/list", Handler::WithStore(corrections_list));
        methods.insert("feedback/record", Handler::WithStore(feedback_record));
        methods.insert("taxonomy/describe", Handler::Stateless(taxonomy_describe));
        methods.insert("agents/list", Handler::Stateless(agents_list));
        Self { methods }
    }

    /// Whether `name` is a registered method.
    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Whether `name` needs a persistence handle, or `None` if unknown.
    pub fn needs_store(&self, name: &str) -> Option<bool> {
        self.methods
            .get(name)
            .map(|h| matches!(h, Handler::WithStore(_)))
    }

    /// All registered method names, sorted.
    pub fn method_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.methods.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Dispatch a call. Unknown names are
    /// [`TriadError::UnknownMethod`]; handler errors pass through
    /// unchanged.
    pub fn dispatch(
        &self,
        name: &str,
        store: &dyn OperationStore,
        params: Value,
    ) -> Result<Value> {
        match self.methods.get(name) {
            Some(Handler::WithStore(handler)) => handler(store, params),
            Some(Handler::Stateless(handler)) => handler(params),
            None => Err(TriadError::UnknownMethod {
                method: name.to_string(),
            }),
        }
    }
}

impl Default for MethodTable {
    fn default() -> Self {
        Self::new()
    }
}

// ── Store-backed handlers ───────────────────────────────────────────────

#[derive(Deserialize)]
struct OperationParams {
    operation_id: Uuid,
}

fn operations_get(store: &dyn OperationStore, params: Value) -> Result<Value> {
    let params: OperationParams = serde_json::from_value(params)?;
    let operation = store
        .get_operation(params.operation_id)?
        .ok_or(TriadError::NotFound {
            operation_id: params.operation_id,
        })?;
    Ok(serde_json::to_value(operation)?)
}

#[derive(Deserialize)]
struct CorrectionsParams {
    #[serde(default = "default_corrections_limit")]
    limit: usize,
}

fn default_corrections_limit() -> usize {
    crate::context::DEFAULT_EXEMPLAR_LIMIT
}

fn corrections_list(store: &dyn OperationStore, params: Value) -> Result<Value> {
    let params: CorrectionsParams = serde_json::from_value(params)?;
    Ok(serde_json::to_value(store.recent_corrections(params.limit))?)
}

fn feedback_record(store: &dyn OperationStore, params: Value) -> Result<Value> {
    let feedback: UserFeedback = serde_json::from_value(params)?;
    store.store_feedback(feedback)?;
    Ok(json!({"ok": true}))
}

// ── Stateless handlers ──────────────────────────────────────────────────

fn taxonomy_describe(_params: Value) -> Result<Value> {
    Ok(json!({
        "destination": Destination::ALL.iter().map(|d| d.as_str()).collect::<Vec<_>>(),
        "consumer": Consumer::ALL.iter().map(|c| c.as_str()).collect::<Vec<_>>(),
        "semantics": Semantics::ALL.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
    }))
}

fn agents_list(_params: Value) -> Result<Value> {
    Ok(json!(
        AgentId::ALL.iter().map(|a| a.as_str()).collect::<Vec<_>>()
    ))
}
