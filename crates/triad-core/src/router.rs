//! Request routing: classification -> target agent.
//!
//! The routing table is a pure function of the three taxonomy axes,
//! represented as data: an ordered slice of entries searched first
//! match wins, so ties break deterministically. The one place policy
//! intrudes is the confidence gate: a not-confident classification is
//! routed to the conservative fallback agent before the table is even
//! consulted.
//!
//! The router holds no state and is safe to call concurrently.

use triad_types::{AgentId, Classification, Consumer, Destination, Result, Semantics, TriadError};

/// One row of the routing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteEntry {
    /// Destination axis to match.
    pub destination: Destination,
    /// Consumer axis to match.
    pub consumer: Consumer,
    /// Semantics axis to match.
    pub semantics: Semantics,
    /// The agent this combination routes to.
    pub agent: AgentId,
}

/// A routing decision with its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDecision {
    /// The selected agent.
    pub agent: AgentId,
    /// Whether the confidence gate forced the fallback path.
    pub fallback: bool,
    /// Human-readable reason for the decision.
    pub reason: String,
}

/// Maps a [`Classification`] to exactly one target agent.
pub struct RequestRouter {
    table: Vec<RouteEntry>,
    fallback: AgentId,
}

/// The built-in table. Covers all 18 points of the taxonomy space:
///
/// - process-destination work goes to the executor,
/// - file-destination work goes to the workspace agent,
/// - stream output goes to conversation, except side-effecting or
///   machine-read streams, which the executor produces.
fn default_table() -> Vec<RouteEntry> {
    use AgentId::*;
    use Consumer::*;
    use Destination::*;
    use Semantics::*;

    let mut table = Vec::with_capacity(18);

    table.push(entry(Stream, Human, Read, Conversation));
    table.push(entry(Stream, Human, Interpret, Conversation));
    table.push(entry(Stream, Human, Execute, Executor));
    table.push(entry(Stream, Machine, Read, Executor));
    table.push(entry(Stream, Machine, Interpret, Conversation));
    table.push(entry(Stream, Machine, Execute, Executor));

    for consumer in Consumer::ALL {
        for semantics in Semantics::ALL {
            table.push(entry(File, consumer, semantics, Workspace));
            table.push(entry(Process, consumer, semantics, Executor));
        }
    }

    table
}

fn entry(
    destination: Destination,
    consumer: Consumer,
    semantics: Semantics,
    agent: AgentId,
) -> RouteEntry {
    RouteEntry {
        destination,
        consumer,
        semantics,
        agent,
    }
}

impl RequestRouter {
    /// A router with the built-in table and the conversation agent as
    /// the low-confidence fallback.
    pub fn new() -> Self {
        Self {
            table: default_table(),
            fallback: AgentId::Conversation,
        }
    }

    /// A router with a caller-supplied table and fallback agent.
    pub fn with_table(table: Vec<RouteEntry>, fallback: AgentId) -> Self {
        Self { table, fallback }
    }

    /// Route a classification to its target agent.
    ///
    /// Low-confidence classifications take the fallback path regardless
    /// of their axis values. A classification with no table entry --
    /// which the built-in table makes impossible, but a custom table
    /// may not -- is a [`TriadError::Routing`], never an arbitrary
    /// agent.
    pub fn route(&self, classification: &Classification) -> Result<RouteDecision> {
        if !classification.confident {
            return Ok(RouteDecision {
                agent: self.fallback,
                fallback: true,
                reason: "low confidence: conservative human-consumer fallback".into(),
            });
        }

        self.table
            .iter()
            .find(|e| {
                e.destination == classification.destination
                    && e.consumer == classification.consumer
                    && e.semantics == classification.semantics
            })
            .map(|e| RouteDecision {
                agent: e.agent,
                fallback: false,
                reason: format!("table entry for {}", classification.triple()),
            })
            .ok_or_else(|| TriadError::Routing {
                detail: classification.triple(),
            })
    }
}

impl Default for RequestRouter {
    fn default() -> Self {
        Self::new()
    }
}
