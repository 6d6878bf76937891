// SPDX-License-Identifier: MIT

//! Meta-agent: the template describing how agents of one kind are spawned.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Special behaviors a meta-agent can opt into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentFlags {
    /// Must be the only agent running system-wide.
    #[serde(default)]
    pub exclusive: bool,
    /// Suppress the completion notification.
    #[serde(default)]
    pub noemail: bool,
    /// Exempt from forced termination on shutdown and watchdog kills.
    #[serde(default)]
    pub nokill: bool,
    /// Must run on the host named `localhost`.
    #[serde(default)]
    pub local: bool,
}

impl AgentFlags {
    /// Parse one `special/*` config value. Unknown values are rejected so a
    /// typo in the config surfaces at load time.
    pub fn set(&mut self, value: &str) -> Result<(), String> {
        match value {
            "EXCLUSIVE" => self.exclusive = true,
            "NOEMAIL" => self.noemail = true,
            "NOKILL" => self.nokill = true,
            "LOCAL" => self.local = true,
            other => return Err(format!("unknown special flag: {}", other)),
        }
        Ok(())
    }
}

impl fmt::Display for AgentFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.exclusive {
            names.push("EXCLUSIVE");
        }
        if self.noemail {
            names.push("NOEMAIL");
        }
        if self.nokill {
            names.push("NOKILL");
        }
        if self.local {
            names.push("LOCAL");
        }
        write!(f, "{}", names.join("|"))
    }
}

/// Template for one agent kind, keyed by `name`.
///
/// `run_count` lives in the engine's registry entry rather than here; the
/// template itself is immutable once captured by a spawned agent, so a
/// config reload never changes the behavior of agents already running.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaAgent {
    pub name: String,
    /// Argv template used to spawn the child.
    pub command: Vec<String>,
    /// Cap on simultaneous live agents of this kind.
    pub max_run: u32,
    pub flags: AgentFlags,
    /// Kill an agent whose last heartbeat is older than this.
    pub heartbeat_timeout: Duration,
    /// Cleared when the config-time test spawn of this kind fails; jobs
    /// for an invalid kind are failed instead of dispatched.
    #[serde(default = "default_valid")]
    pub valid: bool,
}

fn default_valid() -> bool {
    true
}

impl MetaAgent {
    pub fn new(name: impl Into<String>, command: Vec<String>, max_run: u32) -> Self {
        Self {
            name: name.into(),
            command,
            max_run,
            flags: AgentFlags::default(),
            heartbeat_timeout: Duration::from_secs(300),
            valid: true,
        }
    }

    pub fn with_flags(mut self, flags: AgentFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.heartbeat_timeout = timeout;
        self
    }
}

#[cfg(test)]
#[path = "meta_tests.rs"]
mod tests;
