// SPDX-License-Identifier: MIT

//! The line protocol spoken between scheduler and agents.
//!
//! Agents write single lines on stdout; the scheduler writes single lines
//! on the agent's stdin. Both directions are UTF-8, newline terminated.
//! Parsing and serialization round-trip: a well-formed line parses to a
//! message whose `Display` output is the identical line.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One status line from an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentMessage {
    /// Agent is ready for work.
    Ok,
    /// Agent is ending voluntarily with an exit code.
    Bye { code: i32 },
    /// `n` items consumed since the last report.
    Item { count: u64 },
    /// Liveness heartbeat with progress counters.
    Heartbeat { done: u64, total: Option<u64> },
    /// Text forwarded to the notification sink.
    Email { text: String },
    /// Text forwarded to the log sink.
    Log { text: String },
    /// Text forwarded to the log sink at verbose level.
    Verbose { text: String },
    /// Generic `KEY: <n> [<m>]` counter with an all-caps key.
    Counter {
        key: String,
        value: u64,
        extra: Option<u64>,
    },
}

impl AgentMessage {
    /// Parse one nonblank agent line. Returns `None` for lines the protocol
    /// does not recognize; callers log and ignore those.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line == "OK" {
            return Some(AgentMessage::Ok);
        }
        if let Some(rest) = line.strip_prefix("BYE ") {
            return rest.trim().parse().ok().map(|code| AgentMessage::Bye { code });
        }
        if let Some(rest) = line.strip_prefix("ITEM ") {
            return rest.trim().parse().ok().map(|count| AgentMessage::Item { count });
        }
        if let Some(rest) = line.strip_prefix("EMAIL ") {
            return Some(AgentMessage::Email { text: rest.to_string() });
        }
        if let Some(rest) = line.strip_prefix("LOG ") {
            return Some(AgentMessage::Log { text: rest.to_string() });
        }
        if let Some(rest) = line.strip_prefix("VERBOSE ") {
            return Some(AgentMessage::Verbose { text: rest.to_string() });
        }
        Self::parse_counter(line)
    }

    /// Parse the `<KEY>:<ws><n>[<ws><m>]` form. The key is one or more
    /// capital letters; mixed-case keys fall through to the ignored branch.
    fn parse_counter(line: &str) -> Option<Self> {
        let (key, rest) = line.split_once(':')?;
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_uppercase()) {
            return None;
        }
        let mut numbers = rest.split_ascii_whitespace();
        let value: u64 = numbers.next()?.parse().ok()?;
        let extra = match numbers.next() {
            Some(tok) => Some(tok.parse().ok()?),
            None => None,
        };
        if numbers.next().is_some() {
            return None;
        }
        if key == "HEART" {
            return Some(AgentMessage::Heartbeat {
                done: value,
                total: extra,
            });
        }
        Some(AgentMessage::Counter {
            key: key.to_string(),
            value,
            extra,
        })
    }
}

impl fmt::Display for AgentMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentMessage::Ok => write!(f, "OK"),
            AgentMessage::Bye { code } => write!(f, "BYE {}", code),
            AgentMessage::Item { count } => write!(f, "ITEM {}", count),
            AgentMessage::Heartbeat { done, total: None } => write!(f, "HEART: {}", done),
            AgentMessage::Heartbeat {
                done,
                total: Some(total),
            } => write!(f, "HEART: {} {}", done, total),
            AgentMessage::Email { text } => write!(f, "EMAIL {}", text),
            AgentMessage::Log { text } => write!(f, "LOG {}", text),
            AgentMessage::Verbose { text } => write!(f, "VERBOSE {}", text),
            AgentMessage::Counter {
                key,
                value,
                extra: None,
            } => write!(f, "{}: {}", key, value),
            AgentMessage::Counter {
                key,
                value,
                extra: Some(extra),
            } => write!(f, "{}: {} {}", key, value, extra),
        }
    }
}

/// One line from the scheduler to an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkOrder {
    /// Hand off one chunk of paged work.
    Chunk { id: u64 },
    /// Ask the agent to drain and exit.
    Close,
    /// Finalize: no more work will ever come.
    End,
}

impl fmt::Display for WorkOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkOrder::Chunk { id } => write!(f, "{}", id),
            WorkOrder::Close => write!(f, "CLOSE"),
            WorkOrder::End => write!(f, "END"),
        }
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
