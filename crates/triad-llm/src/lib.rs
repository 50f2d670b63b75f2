//! # triad-llm
//!
//! The abstract inference-service capability consumed by the triad
//! engine. The classifier and the intent verifier are the only callers.
//!
//! The concrete backend (local or hosted) lives outside the core; this
//! crate defines the seam: the [`InferenceService`] trait, the
//! per-call [`InferenceOptions`] (timeout is mandatory), the
//! [`InferenceError`] kinds, and a canned test double in [`testing`].

pub mod error;
pub mod options;
pub mod service;
pub mod testing;

pub use error::{InferenceError, Result};
pub use options::InferenceOptions;
pub use service::{InferenceService, complete_with_deadline};
