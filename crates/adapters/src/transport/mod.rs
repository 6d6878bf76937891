// SPDX-License-Identifier: MIT

//! Child-process transport.
//!
//! Contract: given a host descriptor and an argv, produce a pid plus the
//! three standard streams of the running child. Closing the stdin handle
//! must cause eventual child exit. Reaping is not the transport's job —
//! the engine's signal bridge owns `waitpid`.

mod process;

pub use process::ProcessTransport;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeTransport, SpawnedChild};

use dispatch_core::Host;
use std::io::{Read, Write};
use thiserror::Error;

/// Errors from spawning a child.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("empty argv")]
    EmptyArgv,
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
}

/// Handles to a freshly spawned child process.
///
/// The streams are blocking; the engine moves them into reader threads.
pub struct AgentChild {
    pub pid: i32,
    pub stdin: Box<dyn Write + Send>,
    pub stdout: Box<dyn Read + Send>,
    pub stderr: Box<dyn Read + Send>,
}

impl std::fmt::Debug for AgentChild {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentChild").field("pid", &self.pid).finish_non_exhaustive()
    }
}

/// Errors from signaling a child.
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("no such process: {0}")]
    NoSuchProcess(i32),
    #[error("signal failed for pid {pid}: {reason}")]
    Failed { pid: i32, reason: String },
}

/// Spawns agent children on execution hosts and signals them.
pub trait SpawnTransport: Send + Sync + 'static {
    fn spawn(&self, host: &Host, argv: &[String]) -> Result<AgentChild, TransportError>;

    /// Deliver `signo` to the child with this pid.
    fn signal(&self, pid: i32, signo: i32) -> Result<(), SignalError>;
}
