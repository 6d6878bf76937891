// SPDX-License-Identifier: MIT

//! Meta-agent registry.

use dispatch_core::MetaAgent;
use std::collections::HashMap;
use std::sync::Arc;

/// One registered agent kind plus its live-agent counter.
///
/// The template sits behind an `Arc`: an agent captures it at spawn time
/// and keeps that snapshot even if a reload replaces the registry entry.
#[derive(Debug, Clone)]
pub struct MetaEntry {
    pub meta: Arc<MetaAgent>,
    pub run_count: u32,
}

impl MetaEntry {
    /// True when no further agent of this kind may start.
    pub fn is_max_reached(&self) -> bool {
        self.run_count >= self.meta.max_run
    }
}

/// Registry of agent kinds, keyed by name.
#[derive(Debug, Default)]
pub struct MetaRegistry {
    entries: HashMap<String, MetaEntry>,
}

impl MetaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in the agent kinds from a config snapshot, carrying live
    /// counters over by name.
    pub fn replace_all(&mut self, metas: Vec<MetaAgent>) {
        let old = std::mem::take(&mut self.entries);
        for meta in metas {
            let run_count = old.get(&meta.name).map(|e| e.run_count).unwrap_or(0);
            self.entries.insert(
                meta.name.clone(),
                MetaEntry {
                    meta: Arc::new(meta),
                    run_count,
                },
            );
        }
        for (name, entry) in old {
            if entry.run_count > 0 && !self.entries.contains_key(&name) {
                tracing::warn!(meta = %name, run_count = entry.run_count, "agent kind removed from config while agents are live");
                self.entries.insert(name, entry);
            }
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&MetaEntry> {
        self.entries.get(name)
    }

    /// The shared template for a kind, for capture at spawn time.
    pub fn arc(&self, name: &str) -> Option<Arc<MetaAgent>> {
        self.entries.get(name).map(|e| Arc::clone(&e.meta))
    }

    pub fn increment(&mut self, name: &str) {
        if let Some(entry) = self.entries.get_mut(name) {
            entry.run_count += 1;
            if entry.run_count > entry.meta.max_run {
                tracing::warn!(meta = name, run_count = entry.run_count, "meta agent over max_run");
            }
        }
    }

    pub fn decrement(&mut self, name: &str) {
        match self.entries.get_mut(name) {
            Some(entry) if entry.run_count > 0 => entry.run_count -= 1,
            _ => tracing::warn!(meta = name, "decrement on idle meta agent"),
        }
    }

    /// Record the outcome of the config-time test spawn.
    pub fn set_valid(&mut self, name: &str, valid: bool) {
        if let Some(entry) = self.entries.get_mut(name) {
            let mut meta = (*entry.meta).clone();
            meta.valid = valid;
            entry.meta = Arc::new(meta);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetaEntry> {
        self.entries.values()
    }
}

#[cfg(test)]
#[path = "metas_tests.rs"]
mod tests;
