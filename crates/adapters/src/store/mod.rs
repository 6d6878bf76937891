// SPDX-License-Identifier: MIT

//! Job store interface.
//!
//! The scheduler is not the system of record: jobs are enqueued by
//! external clients into a shared store, and the scheduler polls for them,
//! claims them, and writes status transitions back. This module defines
//! that contract plus an in-memory implementation that doubles as the test
//! store.

mod memory;

pub use memory::MemoryJobStore;

use async_trait::async_trait;
use dispatch_core::{JobId, JobRecord, JobStatus};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("no such job: {0}")]
    NotFound(JobId),
}

/// One status write-back for a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobUpdate {
    pub id: JobId,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items_processed: Option<u64>,
}

impl JobUpdate {
    pub fn status(id: JobId, status: JobStatus) -> Self {
        Self {
            id,
            status,
            message: None,
            items_processed: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// The query/update interface the scheduler calls. Implementations live
/// outside the engine; the store bridge owns the only reference.
#[async_trait]
pub trait JobStore: Send + Sync + 'static {
    /// Jobs enqueued since the last poll, in id order.
    async fn poll_new_jobs(&self) -> Result<Vec<JobRecord>, StoreError>;

    /// Persist one status transition.
    async fn update_job(&self, update: JobUpdate) -> Result<(), StoreError>;

    /// Advisory lock so concurrent schedulers cannot run the same job.
    /// Returns false when another instance already holds the claim.
    async fn claim_job(&self, id: JobId) -> Result<bool, StoreError>;

    /// Drop an advisory claim.
    async fn release_job(&self, id: JobId) -> Result<(), StoreError>;
}
