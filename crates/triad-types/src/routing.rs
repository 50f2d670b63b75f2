//! Agent identifiers produced by the request router.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The agents a classified operation can be routed to.
///
/// Agents are named by what they do, not by how they are implemented;
/// the actual agent behavior lives outside this core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentId {
    /// Dialogue and interpretation for a human consumer. Also the
    /// conservative fallback for low-confidence classifications.
    Conversation,
    /// File-destination work: reading, creating, and editing files.
    Workspace,
    /// Process-destination work: running commands and managing processes.
    Executor,
}

impl AgentId {
    /// The wire/display name of this agent.
    pub fn as_str(self) -> &'static str {
        match self {
            AgentId::Conversation => "conversation",
            AgentId::Workspace => "workspace",
            AgentId::Executor => "executor",
        }
    }

    /// All agents, in registration order.
    pub const ALL: [AgentId; 3] = [AgentId::Conversation, AgentId::Workspace, AgentId::Executor];
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
