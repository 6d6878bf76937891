// SPDX-License-Identifier: MIT

//! Job identifier, status, and in-memory state.

use crate::agent::AgentId;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fmt;

/// Identifier of a job: the monotonically increasing id assigned by the
/// store when the job was enqueued.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct JobId(pub u64);

impl JobId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for JobId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Persisted status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Started,
    Paused,
    Restart,
    Failed,
    Complete,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Failed | JobStatus::Complete)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Started => write!(f, "started"),
            JobStatus::Paused => write!(f, "paused"),
            JobStatus::Restart => write!(f, "restart"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Complete => write!(f, "complete"),
        }
    }
}

/// A job as handed over by the store poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub agent_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_host: Option<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<JobId>,
    /// Opaque payload handed to the agent at handshake.
    #[serde(default)]
    pub data: String,
    /// Chunk ids still to be handed out, in order.
    #[serde(default)]
    pub id_list: Vec<u64>,
}

/// In-memory state of a job under supervision.
///
/// Invariant: a job sits in the pending queue iff `status == Queued` and
/// `children` is empty.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub agent_type: String,
    pub required_host: Option<String>,
    pub priority: i32,
    pub parent: Option<JobId>,
    pub status: JobStatus,
    /// Last failure or status string.
    pub message: Option<String>,
    pub data: String,
    /// Chunk ids not yet handed to an agent.
    pub id_list: VecDeque<u64>,
    /// Live agents working on this job.
    pub children: HashSet<AgentId>,
    /// Failed spawn attempts so far.
    pub spawn_attempts: u32,
}

impl Job {
    pub fn from_record(record: JobRecord) -> Self {
        Self {
            id: record.id,
            agent_type: record.agent_type,
            required_host: record.required_host,
            priority: record.priority,
            parent: record.parent,
            status: JobStatus::Queued,
            message: None,
            data: record.data,
            id_list: record.id_list.into(),
            children: HashSet::new(),
            spawn_attempts: 0,
        }
    }

    /// True while at least one agent is working on this job.
    pub fn is_active(&self) -> bool {
        !self.children.is_empty()
    }

    /// Take the next pending chunk, if any.
    pub fn next_chunk(&mut self) -> Option<u64> {
        self.id_list.pop_front()
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.message = Some(message.into());
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
