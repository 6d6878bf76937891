// SPDX-License-Identifier: MIT

//! Event types processed by the scheduler loop.

use crate::agent::AgentId;
use crate::job::{JobId, JobRecord};
use crate::message::AgentMessage;
use serde::{Deserialize, Serialize};

/// Decoded exit status of a reaped child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitStatus {
    /// Exit code, when the child exited normally.
    pub code: Option<i32>,
    /// Terminating signal number, when the child was killed.
    pub signal: Option<i32>,
}

impl ExitStatus {
    pub fn exited(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    pub fn signaled(signal: i32) -> Self {
        Self {
            code: None,
            signal: Some(signal),
        }
    }

    /// Clean zero exit.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Events that drive the scheduler state machine.
///
/// Every producer (signal bridge, agent readers, store bridge, control
/// listener) communicates with the loop exclusively through these.
/// Serializes with `{"type": "source:name", ...fields}` format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    // -- agent --
    /// One parsed protocol line from an agent's stdout.
    #[serde(rename = "agent:message")]
    AgentMessage {
        agent: AgentId,
        message: AgentMessage,
    },

    /// One line captured from an agent's stderr.
    #[serde(rename = "agent:stderr")]
    AgentStderr { agent: AgentId, line: String },

    /// The child died and was reaped. Delivered after all of the agent's
    /// output events; repeated deliveries for one pid are no-ops.
    #[serde(rename = "agent:death")]
    AgentDeath {
        agent: AgentId,
        pid: i32,
        status: ExitStatus,
    },

    /// Periodic watchdog pass over all live agents.
    #[serde(rename = "agent:update")]
    AgentUpdate,

    // -- job --
    #[serde(rename = "job:pause")]
    JobPause { id: JobId },

    #[serde(rename = "job:restart")]
    JobRestart { id: JobId },

    #[serde(rename = "job:kill")]
    JobKill { id: JobId, message: String },

    // -- store --
    /// Ask the store bridge for newly queued jobs.
    #[serde(rename = "store:poll")]
    StorePoll,

    /// Newly claimed jobs returned by the store bridge.
    #[serde(rename = "store:polled")]
    JobsPolled { records: Vec<JobRecord> },

    // -- scheduler --
    /// Begin shutdown. `force` kills live agents instead of waiting.
    #[serde(rename = "scheduler:close")]
    Close { force: bool },

    /// Re-read configuration and rebuild the registries.
    #[serde(rename = "config:reload")]
    ConfigReload,
}

impl Event {
    pub fn name(&self) -> &str {
        match self {
            Event::AgentMessage { .. } => "agent:message",
            Event::AgentStderr { .. } => "agent:stderr",
            Event::AgentDeath { .. } => "agent:death",
            Event::AgentUpdate => "agent:update",
            Event::JobPause { .. } => "job:pause",
            Event::JobRestart { .. } => "job:restart",
            Event::JobKill { .. } => "job:kill",
            Event::StorePoll => "store:poll",
            Event::JobsPolled { .. } => "store:polled",
            Event::Close { .. } => "scheduler:close",
            Event::ConfigReload => "config:reload",
        }
    }

    /// One-line rendering for the trace log.
    pub fn log_summary(&self) -> String {
        let t = self.name();
        match self {
            Event::AgentMessage { agent, message } => format!("{t} agent={agent} msg={message}"),
            Event::AgentStderr { agent, .. } => format!("{t} agent={agent}"),
            Event::AgentDeath { agent, pid, status } => {
                if let Some(code) = status.code {
                    format!("{t} agent={agent} pid={pid} code={code}")
                } else {
                    format!("{t} agent={agent} pid={pid} signal={:?}", status.signal)
                }
            }
            Event::AgentUpdate | Event::StorePoll | Event::ConfigReload => t.to_string(),
            Event::JobPause { id } | Event::JobRestart { id } => format!("{t} id={id}"),
            Event::JobKill { id, message } => format!("{t} id={id} msg={message}"),
            Event::JobsPolled { records } => format!("{t} count={}", records.len()),
            Event::Close { force } => format!("{t} force={force}"),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
