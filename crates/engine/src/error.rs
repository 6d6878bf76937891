// SPDX-License-Identifier: MIT

//! Error types for the engine

use dispatch_adapters::TransportError;
use dispatch_core::{AgentId, JobId};
use thiserror::Error;

/// Errors that can occur while handling an event.
///
/// These never unwind the loop: the loop logs them and moves on, after the
/// handler has already moved the affected entity to a terminal state.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("job not found: {0}")]
    JobNotFound(JobId),
    #[error("agent not found: {0}")]
    AgentNotFound(AgentId),
    #[error("no meta agent for type: {0}")]
    MetaNotFound(String),
    #[error("host not found: {0}")]
    HostNotFound(String),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("agent write failed: {0}")]
    AgentWrite(#[from] std::io::Error),
    #[error("config reload failed: {0}")]
    Reload(String),
}
