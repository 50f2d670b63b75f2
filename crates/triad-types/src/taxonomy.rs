//! The 3x2x3 request taxonomy.
//!
//! Every incoming request is classified along three independent axes:
//!
//! - **[`Destination`]** -- where the result of the request goes
//! - **[`Consumer`]** -- who consumes the result
//! - **[`Semantics`]** -- what kind of action the request performs
//!
//! A [`Classification`] is a point in this 3x2x3 space plus a boolean
//! confidence flag. The enums are closed on purpose: the router matches
//! exhaustively over them, and an out-of-vocabulary value in classifier
//! output is a parse error, never a default.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where the output of an operation goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    /// Ephemeral output, displayed once and discarded.
    Stream,
    /// Persistent storage in a file.
    File,
    /// Spawns or controls a system process.
    Process,
}

impl Destination {
    /// The wire/display name of this destination.
    pub fn as_str(self) -> &'static str {
        match self {
            Destination::Stream => "stream",
            Destination::File => "file",
            Destination::Process => "process",
        }
    }

    /// All destinations, in taxonomy order.
    pub const ALL: [Destination; 3] = [Destination::Stream, Destination::File, Destination::Process];
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who consumes the result of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Consumer {
    /// A human reads and interprets the result.
    Human,
    /// Another program processes the result further.
    Machine,
}

impl Consumer {
    /// The wire/display name of this consumer.
    pub fn as_str(self) -> &'static str {
        match self {
            Consumer::Human => "human",
            Consumer::Machine => "machine",
        }
    }

    /// All consumers, in taxonomy order.
    pub const ALL: [Consumer; 2] = [Consumer::Human, Consumer::Machine];
}

impl fmt::Display for Consumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of action an operation performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Semantics {
    /// Retrieve existing data without changing anything.
    Read,
    /// Analyze, explain, or transform data.
    Interpret,
    /// Perform a side-effecting action.
    Execute,
}

impl Semantics {
    /// The wire/display name of these semantics.
    pub fn as_str(self) -> &'static str {
        match self {
            Semantics::Read => "read",
            Semantics::Interpret => "interpret",
            Semantics::Execute => "execute",
        }
    }

    /// All semantics, in taxonomy order.
    pub const ALL: [Semantics; 3] = [Semantics::Read, Semantics::Interpret, Semantics::Execute];
}

impl fmt::Display for Semantics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result of classifying a request: one value per axis plus a
/// boolean confidence gate.
///
/// `confident` is deliberately a boolean, not a score. The router uses
/// it as a gate: a not-confident classification is always routed to the
/// conservative human-consumer fallback, whatever the axes say.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// Where the operation output goes.
    pub destination: Destination,

    /// Who consumes the result.
    pub consumer: Consumer,

    /// What kind of action the operation performs.
    pub semantics: Semantics,

    /// Whether the classifier was confident in this classification.
    pub confident: bool,

    /// Optional free-text rationale from the classifier, kept verbatim
    /// for audit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl Classification {
    /// Create a classification without rationale text.
    pub fn new(
        destination: Destination,
        consumer: Consumer,
        semantics: Semantics,
        confident: bool,
    ) -> Self {
        Self {
            destination,
            consumer,
            semantics,
            confident,
            reasoning: None,
        }
    }

    /// Attach rationale text.
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    /// The three axis values as a `dest/consumer/semantics` string,
    /// used in prompts and log lines.
    pub fn triple(&self) -> String {
        format!("{}/{}/{}", self.destination, self.consumer, self.semantics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_serde_snake_case() {
        assert_eq!(serde_json::to_string(&Destination::Stream).unwrap(), "\"stream\"");
        let d: Destination = serde_json::from_str("\"process\"").unwrap();
        assert_eq!(d, Destination::Process);
    }

    #[test]
    fn unknown_axis_value_is_an_error() {
        let result = serde_json::from_str::<Semantics>("\"transmogrify\"");
        assert!(result.is_err());
    }

    #[test]
    fn display_matches_wire_names() {
        assert_eq!(Destination::File.to_string(), "file");
        assert_eq!(Consumer::Machine.to_string(), "machine");
        assert_eq!(Semantics::Interpret.to_string(), "interpret");
    }

    #[test]
    fn all_constants_cover_the_space() {
        assert_eq!(Destination::ALL.len(), 3);
        assert_eq!(Consumer::ALL.len(), 2);
        assert_eq!(Semantics::ALL.len(), 3);
    }

    #[test]
    fn classification_roundtrip() {
        let c = Classification::new(
            Destination::Stream,
            Consumer::Human,
            Semantics::Interpret,
            true,
        )
        .with_reasoning("greeting");
        let json = serde_json::to_string(&c).unwrap();
        let restored: Classification = serde_json::from_str(&json).unwrap();
        assert_eq!(c, restored);
    }

    #[test]
    fn classification_reasoning_skipped_when_absent() {
        let c = Classification::new(Destination::File, Consumer::Human, Semantics::Execute, true);
        let json = serde_json::to_string(&c).unwrap();
        assert!(!json.contains("reasoning"));
    }

    #[test]
    fn triple_formatting() {
        let c = Classification::new(
            Destination::Process,
            Consumer::Machine,
            Semantics::Execute,
            true,
        );
        assert_eq!(c.triple(), "process/machine/execute");
    }
}
