// SPDX-License-Identifier: MIT

//! Status snapshot shared with the control listener.
//!
//! The loop republishes this after every event; the listener renders it
//! for `status` commands without ever touching scheduler state.

use dispatch_core::{AgentState, JobId, JobStatus};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

/// Shared handle; the loop writes, the listener reads.
pub type StatusShare = Arc<Mutex<StatusSnapshot>>;

#[derive(Debug, Clone, Serialize, Default)]
pub struct StatusSnapshot {
    pub closing: bool,
    pub startup: bool,
    pub lockout: bool,
    pub queued: usize,
    pub jobs: Vec<JobLine>,
    pub agents: Vec<AgentLine>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobLine {
    pub id: JobId,
    pub agent_type: String,
    pub status: JobStatus,
    pub children: usize,
    pub remaining_chunks: usize,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentLine {
    pub id: String,
    pub pid: i32,
    pub kind: String,
    pub host: String,
    pub state: AgentState,
    pub items_processed: u64,
}

impl StatusSnapshot {
    /// Render the multi-line dump for the control socket. With an id,
    /// only that job (and its agents) is shown.
    pub fn render(&self, job: Option<JobId>) -> String {
        let mut out = String::new();
        if job.is_none() {
            out.push_str(&format!(
                "scheduler: queued:{} running:{} closing:{}\n",
                self.queued,
                self.agents.len(),
                self.closing
            ));
        }
        for line in &self.jobs {
            if job.is_some_and(|id| id != line.id) {
                continue;
            }
            out.push_str(&format!(
                "job:{} type:{} status:{} agents:{} remaining:{}\n",
                line.id, line.agent_type, line.status, line.children, line.remaining_chunks
            ));
            if let Some(message) = &line.message {
                out.push_str(&format!("job:{} message:{}\n", line.id, message));
            }
        }
        for agent in &self.agents {
            out.push_str(&format!(
                "agent:{} pid:{} kind:{} host:{} state:{} items:{}\n",
                agent.id, agent.pid, agent.kind, agent.host, agent.state, agent.items_processed
            ));
        }
        out.push_str("end\n");
        out
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
