// SPDX-License-Identifier: MIT

//! Pending-job queue, ordered by (priority desc, id asc).

use dispatch_core::JobId;
use std::cmp::Reverse;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QueueEntry {
    priority: i32,
    id: JobId,
}

impl QueueEntry {
    fn sort_key(&self) -> (Reverse<i32>, JobId) {
        (Reverse(self.priority), self.id)
    }
}

/// Priority-FIFO sequence of pending job ids.
///
/// Higher priority runs first; within a priority class the lower (older)
/// id runs first. The scheduler tick only ever looks at the head — a full
/// meta or host breaks placement rather than skipping ahead, which is what
/// keeps the FIFO promise.
#[derive(Debug, Default)]
pub struct JobQueue {
    entries: Vec<QueueEntry>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next job to place, without removing it.
    pub fn peek(&self) -> Option<JobId> {
        self.entries.first().map(|e| e.id)
    }

    /// Drop the head.
    pub fn advance(&mut self) {
        if !self.entries.is_empty() {
            self.entries.remove(0);
        }
    }

    /// Insert positioned by the comparator.
    pub fn insert(&mut self, id: JobId, priority: i32) {
        let entry = QueueEntry { priority, id };
        let index = self
            .entries
            .binary_search_by_key(&entry.sort_key(), QueueEntry::sort_key)
            .unwrap_or_else(|i| i);
        self.entries.insert(index, entry);
    }

    pub fn remove(&mut self, id: JobId) {
        self.entries.retain(|e| e.id != id);
    }

    pub fn contains(&self, id: JobId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = JobId> + '_ {
        self.entries.iter().map(|e| e.id)
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
