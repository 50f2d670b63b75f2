//! # triad-core
//!
//! The classify -> route -> verify -> learn core of the triad engine.
//!
//! A request enters as free-form text, is classified along the 3x2x3
//! taxonomy (biased by past correction exemplars), routed to the agent
//! capable of handling that kind of request, and the agent's proposed
//! action is validated by a five-stage verification pipeline before it
//! is allowed to take effect. User corrections flow back through the
//! operation store and become exemplars for future classifications.
//!
//! - **[`context`]** -- correction exemplars served to the classifier
//! - **[`classifier`]** -- request text -> [`triad_types::Classification`]
//! - **[`router`]** -- classification -> target agent
//! - **[`verify`]** -- the five-stage verification pipeline
//! - **[`store`]** -- operation lifecycle + feedback ingestion
//! - **[`engine`]** -- the orchestrator tying the stages together
//! - **[`dispatch`]** -- explicit method table for the transport layer
//! - **[`config`]** -- engine configuration
//! - **[`json_repair`]** -- one-pass repair of malformed LLM JSON

pub mod classifier;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod engine;
pub mod json_repair;
pub mod router;
pub mod store;
pub mod verify;
