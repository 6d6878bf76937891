// SPDX-License-Identifier: MIT

//! Pre-parsed configuration snapshot.
//!
//! The scheduler never reads config files itself. A `ConfigLoader`
//! implementation (in the daemon) produces two flattened key/value maps —
//! the platform tree and the agents tree — and [`ConfigSnapshot::from_maps`]
//! validates them into typed registries. All validation happens up front so
//! a failed reload can keep the previous snapshot untouched.

use crate::host::Host;
use crate::meta::{AgentFlags, MetaAgent};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while validating a configuration tree.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required key: {0}")]
    MissingKey(String),
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Global scheduler knobs from the platform tree's `scheduler/*` keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerKnobs {
    /// Port the control socket listens on.
    pub port: u16,
    /// Directory for the scheduler log, when configured.
    pub log_dir: Option<PathBuf>,
    /// Period between watchdog and store-poll rounds.
    pub agent_update_interval: Duration,
    /// Default heartbeat timeout for metas that configure none.
    pub agent_death_timeout: Duration,
    /// Spawn attempts per job before it is failed.
    pub spawn_retries: u32,
}

impl Default for SchedulerKnobs {
    fn default() -> Self {
        Self {
            port: 0,
            log_dir: None,
            agent_update_interval: Duration::from_secs(120),
            agent_death_timeout: Duration::from_secs(300),
            spawn_retries: 3,
        }
    }
}

/// A validated configuration snapshot, ready for the engine.
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    pub knobs: SchedulerKnobs,
    pub hosts: Vec<Host>,
    pub agents: Vec<MetaAgent>,
}

impl ConfigSnapshot {
    /// Validate the two config trees.
    ///
    /// Platform keys: `hosts/<name>` (value `"<address> <dir> <max> <tag>"`),
    /// `scheduler/port`, `directories/logdir`, and the `scheduler/*` knobs.
    /// Agent keys: `agents/<name>/{command, max, heartbeat_timeout,
    /// special/<k>}`.
    pub fn from_maps(
        platform: &BTreeMap<String, String>,
        agents: &BTreeMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let mut knobs = SchedulerKnobs {
            port: require_parsed(platform, "scheduler/port")?,
            ..Default::default()
        };
        if let Some(dir) = platform.get("directories/logdir") {
            knobs.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(secs) = parse_opt::<u64>(platform, "scheduler/agent_update_interval")? {
            knobs.agent_update_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_opt::<u64>(platform, "scheduler/agent_death_timeout")? {
            knobs.agent_death_timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = parse_opt::<u32>(platform, "scheduler/spawn_retries")? {
            knobs.spawn_retries = retries;
        }

        let mut hosts = Vec::new();
        for (key, value) in platform.range("hosts/".to_string()..) {
            let Some(name) = key.strip_prefix("hosts/") else {
                break;
            };
            hosts.push(parse_host(name, key, value)?);
        }

        let metas = parse_agents(agents, &knobs)?;

        Ok(Self {
            knobs,
            hosts,
            agents: metas,
        })
    }
}

fn parse_host(name: &str, key: &str, value: &str) -> Result<Host, ConfigError> {
    let fields: Vec<&str> = value.split_whitespace().collect();
    let &[address, directory, max, tag] = fields.as_slice() else {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            reason: format!("expected \"<address> <dir> <max> <tag>\", got {:?}", value),
        });
    };
    let max: u32 = max.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        reason: format!("max is not an integer: {}", max),
    })?;
    Ok(Host::new(name, address, directory, max, tag))
}

fn parse_agents(
    agents: &BTreeMap<String, String>,
    knobs: &SchedulerKnobs,
) -> Result<Vec<MetaAgent>, ConfigError> {
    // Collect the distinct agent names first; each then pulls its own keys.
    let mut names: Vec<&str> = agents
        .keys()
        .filter_map(|k| k.strip_prefix("agents/"))
        .filter_map(|k| k.split('/').next())
        .collect();
    names.dedup();

    let mut metas = Vec::new();
    for name in names {
        let command_key = format!("agents/{}/command", name);
        let command = agents
            .get(&command_key)
            .ok_or(ConfigError::MissingKey(command_key))?;
        let argv: Vec<String> = command.split_whitespace().map(String::from).collect();
        if argv.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: format!("agents/{}/command", name),
                reason: "empty command".to_string(),
            });
        }

        let max_run: u32 = require_parsed(agents, &format!("agents/{}/max", name))?;

        let mut flags = AgentFlags::default();
        let special_prefix = format!("agents/{}/special/", name);
        for (key, value) in agents.range(special_prefix.clone()..) {
            if !key.starts_with(&special_prefix) {
                break;
            }
            flags.set(value).map_err(|reason| ConfigError::InvalidValue {
                key: key.clone(),
                reason,
            })?;
        }

        let heartbeat = parse_opt::<u64>(agents, &format!("agents/{}/heartbeat_timeout", name))?
            .map(Duration::from_secs)
            .unwrap_or(knobs.agent_death_timeout);

        metas.push(
            MetaAgent::new(name, argv, max_run)
                .with_flags(flags)
                .with_heartbeat_timeout(heartbeat),
        );
    }
    Ok(metas)
}

fn require_parsed<T: std::str::FromStr>(
    map: &BTreeMap<String, String>,
    key: &str,
) -> Result<T, ConfigError> {
    let value = map
        .get(key)
        .ok_or_else(|| ConfigError::MissingKey(key.to_string()))?;
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        reason: format!("cannot parse {:?}", value),
    })
}

fn parse_opt<T: std::str::FromStr>(
    map: &BTreeMap<String, String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match map.get(key) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                reason: format!("cannot parse {:?}", value),
            }),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
