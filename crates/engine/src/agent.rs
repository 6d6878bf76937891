// SPDX-License-Identifier: MIT

//! Live agent handle: the loop-side state for one supervised child.

use dispatch_core::{AgentId, AgentState, JobId, MetaAgent, WorkOrder};
use std::collections::VecDeque;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

/// Lines of stderr kept per agent for the failure message.
const STDERR_TAIL: usize = 10;

/// One supervised child process.
///
/// Owned exclusively by the scheduler from spawn to reap. The stdin
/// writer is the only live I/O handle held on the loop thread; stdout and
/// stderr belong to the reader threads.
pub struct Agent {
    pub id: AgentId,
    /// Template captured at spawn; reloads never touch it.
    pub meta: Arc<MetaAgent>,
    pub host: String,
    /// Owning job; `None` for config-time test spawns.
    pub owner: Option<JobId>,
    pub state: AgentState,
    pub pid: i32,
    stdin: Option<Box<dyn Write + Send>>,
    pub last_heartbeat: Instant,
    pub items_processed: u64,
    pub total_items: u64,
    stderr_tail: VecDeque<String>,
    /// Updated from the reaper; once false the pid is gone.
    pub alive: bool,
    /// State to restore when a paused agent resumes.
    pub resume_state: Option<AgentState>,
}

impl Agent {
    pub fn new(
        id: AgentId,
        meta: Arc<MetaAgent>,
        host: impl Into<String>,
        owner: Option<JobId>,
        pid: i32,
        stdin: Box<dyn Write + Send>,
        now: Instant,
    ) -> Self {
        Self {
            id,
            meta,
            host: host.into(),
            owner,
            state: AgentState::Spawned,
            pid,
            stdin: Some(stdin),
            last_heartbeat: now,
            items_processed: 0,
            total_items: 0,
            stderr_tail: VecDeque::new(),
            alive: true,
            resume_state: None,
        }
    }

    /// Move to `next`, refusing to leave a terminal state.
    pub fn set_state(&mut self, next: AgentState) {
        if self.state.is_terminal() && next != self.state {
            tracing::warn!(agent = %self.id, from = %self.state, to = %next, "transition out of terminal state refused");
            return;
        }
        tracing::debug!(agent = %self.id, from = %self.state, to = %next, "agent state");
        self.state = next;
    }

    /// Write one work order line on the child's stdin.
    pub fn send(&mut self, order: &WorkOrder) -> std::io::Result<()> {
        self.send_line(&order.to_string())
    }

    /// Write one raw line (the job's data blob at handshake).
    pub fn send_line(&mut self, line: &str) -> std::io::Result<()> {
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "stdin already closed",
            ));
        };
        writeln!(stdin, "{}", line)?;
        stdin.flush()
    }

    /// Drop the stdin handle; a draining child sees EOF and exits.
    pub fn close_stdin(&mut self) {
        self.stdin = None;
    }

    pub fn push_stderr(&mut self, line: String) {
        if self.stderr_tail.len() == STDERR_TAIL {
            self.stderr_tail.pop_front();
        }
        self.stderr_tail.push_back(line);
    }

    /// The captured stderr tail, for the job failure message.
    pub fn stderr_message(&self) -> String {
        if self.stderr_tail.is_empty() {
            return "agent produced no error output".to_string();
        }
        self.stderr_tail
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn touch_heartbeat(&mut self, now: Instant) {
        self.last_heartbeat = now;
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
