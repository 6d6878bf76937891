// SPDX-License-Identifier: MIT

//! Agent identifier and lifecycle states.
//!
//! An agent is one spawned child process working on behalf of a job (or on
//! behalf of the config-time validation round, which owns no job). Agents
//! are keyed by an internal token from spawn time; the OS pid is attached
//! once the child is running.

use serde::{Deserialize, Serialize};
use std::fmt;

crate::define_id! {
    /// Unique identifier for an agent instance.
    ///
    /// Assigned before the child process exists, so spawn failures can be
    /// reported against a stable key. Opaque to consumers.
    pub struct AgentId;
}

/// Lifecycle state of an agent child process.
///
/// Transitions are event-driven and serialized on the scheduler loop.
/// `Finished` and `Failed` are terminal; an agent never leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    /// Child created, handshake (`OK`) not yet seen
    Spawned,
    /// Handshake complete, waiting for work
    Ready,
    /// Working on a chunk
    Busy,
    /// Suspended by operator request
    Paused,
    /// Asked to drain; waiting for the child to exit
    Closing,
    /// Ended voluntarily with a clean `BYE`
    Finished,
    /// Spawn failure, crash, or kill
    Failed,
}

impl AgentState {
    /// Terminal states never transition back.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentState::Finished | AgentState::Failed)
    }

    /// True while the agent counts against host and meta-agent caps.
    pub fn is_live(&self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentState::Spawned => write!(f, "spawned"),
            AgentState::Ready => write!(f, "ready"),
            AgentState::Busy => write!(f, "busy"),
            AgentState::Paused => write!(f, "paused"),
            AgentState::Closing => write!(f, "closing"),
            AgentState::Finished => write!(f, "finished"),
            AgentState::Failed => write!(f, "failed"),
        }
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
