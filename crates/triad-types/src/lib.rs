//! # triad-types
//!
//! Core type definitions for the triad request triage engine.
//!
//! This crate is the foundation of the dependency graph -- the other
//! triad crates depend on it. It contains:
//!
//! - **[`taxonomy`]** -- The 3x2x3 classification taxonomy and [`Classification`]
//! - **[`routing`]** -- Agent identifiers produced by the request router
//! - **[`operation`]** -- [`AtomicOperation`], its status machine, and feedback records
//! - **[`error`]** -- The [`TriadError`] error type

pub mod error;
pub mod operation;
pub mod routing;
pub mod taxonomy;

pub use error::{Result, TriadError};
pub use operation::{
    AtomicOperation, ClassificationRecord, CorrectionExemplar, FeedbackType, OperationStatus,
    UserFeedback,
};
pub use routing::AgentId;
pub use taxonomy::{Classification, Consumer, Destination, Semantics};
