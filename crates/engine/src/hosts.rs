// SPDX-License-Identifier: MIT

//! Host registry with the round-robin placement cursor.

use dispatch_core::Host;
use indexmap::IndexMap;

/// Ordered set of execution hosts.
///
/// Iteration order is config order, which the round-robin cursor walks so
/// unpinned jobs spread across hosts instead of piling on the first one.
/// Only the loop thread mutates counts.
#[derive(Debug, Default)]
pub struct HostRegistry {
    hosts: IndexMap<String, Host>,
    cursor: usize,
}

impl HostRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a fresh host list from a config snapshot.
    ///
    /// Running counts carry over by name. A host that disappeared from the
    /// config while it still has live agents is retained with `max = 0` so
    /// nothing new lands there and its counter can drain to zero.
    pub fn replace_all(&mut self, hosts: Vec<Host>) {
        let old = std::mem::take(&mut self.hosts);
        for mut host in hosts {
            if let Some(previous) = old.get(&host.name) {
                host.running = previous.running;
            }
            self.hosts.insert(host.name.clone(), host);
        }
        for (name, mut host) in old {
            if host.running > 0 && !self.hosts.contains_key(&name) {
                tracing::warn!(host = %name, running = host.running, "host removed from config while agents are live");
                host.max = 0;
                self.hosts.insert(name, host);
            }
        }
        self.cursor = 0;
    }

    pub fn get(&self, name: &str) -> Option<&Host> {
        self.hosts.get(name)
    }

    /// Walk the circular cursor; return the first host with spare capacity.
    pub fn next_free(&mut self) -> Option<String> {
        let len = self.hosts.len();
        for step in 0..len {
            let index = (self.cursor + step) % len;
            if let Some((name, host)) = self.hosts.get_index(index) {
                if host.has_capacity() {
                    self.cursor = (index + 1) % len;
                    return Some(name.clone());
                }
            }
        }
        None
    }

    pub fn increment(&mut self, name: &str) {
        if let Some(host) = self.hosts.get_mut(name) {
            host.running += 1;
            if host.running > host.max {
                tracing::warn!(host = name, running = host.running, max = host.max, "host over capacity");
            }
        }
    }

    pub fn decrement(&mut self, name: &str) {
        match self.hosts.get_mut(name) {
            Some(host) if host.running > 0 => host.running -= 1,
            Some(_) => tracing::warn!(host = name, "decrement on idle host"),
            None => tracing::warn!(host = name, "decrement on unknown host"),
        }
    }

    /// Total live agents across all hosts.
    pub fn total_running(&self) -> u32 {
        self.hosts.values().map(|h| h.running).sum()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Host> {
        self.hosts.values()
    }
}

#[cfg(test)]
#[path = "hosts_tests.rs"]
mod tests;
