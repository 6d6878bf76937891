// SPDX-License-Identifier: MIT

//! In-memory job store.

use super::{JobStore, JobUpdate, StoreError};
use async_trait::async_trait;
use dispatch_core::{JobId, JobRecord};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Store backed by process memory.
///
/// Serves two roles: the default store for a standalone daemon with no
/// external database, and the scriptable store for engine tests (inject
/// jobs with [`push_job`](Self::push_job), assert on
/// [`updates`](Self::updates), force failures with
/// [`fail_polls`](Self::fail_polls)).
#[derive(Clone, Default)]
pub struct MemoryJobStore {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    next_id: u64,
    pending: Vec<JobRecord>,
    claimed: HashSet<JobId>,
    updates: Vec<JobUpdate>,
    fail_polls: u32,
    fail_updates: u32,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a job as an external client would. Returns the assigned id.
    pub fn push_job(&self, mut record: JobRecord) -> JobId {
        let mut state = self.inner.lock();
        state.next_id += 1;
        record.id = JobId::new(state.next_id);
        let id = record.id;
        state.pending.push(record);
        id
    }

    /// All status writes persisted so far, in write order.
    pub fn updates(&self) -> Vec<JobUpdate> {
        self.inner.lock().updates.clone()
    }

    /// Fail the next `n` polls with `StoreError::Unavailable`.
    pub fn fail_polls(&self, n: u32) {
        self.inner.lock().fail_polls = n;
    }

    /// Fail the next `n` status writes with `StoreError::Unavailable`.
    pub fn fail_updates(&self, n: u32) {
        self.inner.lock().fail_updates = n;
    }

    pub fn claimed(&self) -> Vec<JobId> {
        let mut ids: Vec<JobId> = self.inner.lock().claimed.iter().copied().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn poll_new_jobs(&self) -> Result<Vec<JobRecord>, StoreError> {
        let mut state = self.inner.lock();
        if state.fail_polls > 0 {
            state.fail_polls -= 1;
            return Err(StoreError::Unavailable("poll failed".to_string()));
        }
        let mut records = std::mem::take(&mut state.pending);
        records.sort_by_key(|r| r.id);
        Ok(records)
    }

    async fn update_job(&self, update: JobUpdate) -> Result<(), StoreError> {
        let mut state = self.inner.lock();
        if state.fail_updates > 0 {
            state.fail_updates -= 1;
            return Err(StoreError::Unavailable("write failed".to_string()));
        }
        state.updates.push(update);
        Ok(())
    }

    async fn claim_job(&self, id: JobId) -> Result<bool, StoreError> {
        Ok(self.inner.lock().claimed.insert(id))
    }

    async fn release_job(&self, id: JobId) -> Result<(), StoreError> {
        self.inner.lock().claimed.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
