// SPDX-License-Identifier: MIT

//! Store bridge: the producer task that owns the job store.
//!
//! Loop handlers must never wait on the store, so they talk to this task
//! through a request channel and get results back as events. Poll
//! failures retry with exponential backoff; status writes that fail are
//! queued and replayed once the store answers again.

use crate::event_loop::EventQueue;
use dispatch_adapters::{JobStore, JobUpdate};
use dispatch_core::{Event, JobId};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const BACKOFF_BASE: Duration = Duration::from_millis(250);
const BACKOFF_MAX: Duration = Duration::from_secs(30);

/// Requests the loop sends to the bridge.
#[derive(Debug)]
pub(crate) enum StoreRequest {
    Poll,
    Update(JobUpdate),
    Release(JobId),
}

/// Loop-side handle to the bridge task.
#[derive(Clone)]
pub struct StoreHandle {
    tx: mpsc::UnboundedSender<StoreRequest>,
}

impl StoreHandle {
    pub fn poll(&self) {
        self.send(StoreRequest::Poll);
    }

    pub fn update(&self, update: JobUpdate) {
        self.send(StoreRequest::Update(update));
    }

    pub fn release(&self, id: JobId) {
        self.send(StoreRequest::Release(id));
    }

    fn send(&self, request: StoreRequest) {
        if self.tx.send(request).is_err() {
            tracing::debug!("store request dropped: bridge is gone");
        }
    }
}

/// Start the bridge task. Requires an ambient tokio runtime.
pub fn spawn_store_bridge<S: JobStore>(store: Arc<S>, events: EventQueue) -> StoreHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(run(store, events, rx));
    StoreHandle { tx }
}

/// A handle whose requests land in the returned receiver instead of a
/// store, so state-machine tests can assert on the write stream.
#[cfg(test)]
pub(crate) fn test_handle() -> (StoreHandle, mpsc::UnboundedReceiver<StoreRequest>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (StoreHandle { tx }, rx)
}

async fn run<S: JobStore>(
    store: Arc<S>,
    events: EventQueue,
    mut rx: mpsc::UnboundedReceiver<StoreRequest>,
) {
    let mut pending_writes: VecDeque<JobUpdate> = VecDeque::new();

    while let Some(request) = rx.recv().await {
        match request {
            StoreRequest::Poll => {
                poll_with_backoff(&store, &events).await;
                replay_writes(&store, &mut pending_writes).await;
            }
            StoreRequest::Update(update) => {
                if let Err(e) = store.update_job(update.clone()).await {
                    tracing::warn!(job = %update.id, error = %e, "status write failed, queued for replay");
                    pending_writes.push_back(update);
                }
            }
            StoreRequest::Release(id) => {
                if let Err(e) = store.release_job(id).await {
                    tracing::warn!(job = %id, error = %e, "claim release failed");
                }
            }
        }
    }
}

async fn poll_with_backoff<S: JobStore>(store: &Arc<S>, events: &EventQueue) {
    let mut backoff = BACKOFF_BASE;
    loop {
        match store.poll_new_jobs().await {
            Ok(records) => {
                let mut claimed = Vec::new();
                for record in records {
                    match store.claim_job(record.id).await {
                        Ok(true) => claimed.push(record),
                        Ok(false) => {
                            tracing::debug!(job = %record.id, "job already claimed elsewhere");
                        }
                        Err(e) => {
                            tracing::warn!(job = %record.id, error = %e, "claim failed, leaving job for the next poll");
                        }
                    }
                }
                if !claimed.is_empty() {
                    events.send(Event::JobsPolled { records: claimed });
                }
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, backoff_ms = backoff.as_millis() as u64, "store poll failed, retrying");
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(BACKOFF_MAX);
            }
        }
    }
}

async fn replay_writes<S: JobStore>(store: &Arc<S>, pending: &mut VecDeque<JobUpdate>) {
    while let Some(update) = pending.pop_front() {
        if let Err(e) = store.update_job(update.clone()).await {
            tracing::warn!(job = %update.id, error = %e, "replay write failed, keeping it queued");
            pending.push_front(update);
            return;
        }
    }
}

#[cfg(test)]
#[path = "store_bridge_tests.rs"]
mod tests;
