// SPDX-License-Identifier: MIT

//! Execution host descriptor.

use serde::{Deserialize, Serialize};

/// Name of the host the scheduler itself runs on. Agents flagged LOCAL are
/// pinned here.
pub const LOCAL_HOST: &str = "localhost";

/// One execution target with a cap on concurrent agents.
///
/// `running` is only mutated on the scheduler loop: incremented at spawn,
/// decremented at reap. Invariant: `0 <= running <= max`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Host {
    pub name: String,
    /// Address the transport connects to (hostname or IP).
    pub address: String,
    /// Working directory for agents on this host.
    pub directory: String,
    /// Free-form tag describing the kind of agents this host accepts.
    pub agent_tag: String,
    pub max: u32,
    #[serde(default)]
    pub running: u32,
}

impl Host {
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        directory: impl Into<String>,
        max: u32,
        agent_tag: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            directory: directory.into(),
            agent_tag: agent_tag.into(),
            max,
            running: 0,
        }
    }

    /// True when another agent can be placed here.
    pub fn has_capacity(&self) -> bool {
        self.running < self.max
    }

    /// True when this is the scheduler's own host.
    pub fn is_local(&self) -> bool {
        self.name == LOCAL_HOST
    }
}
