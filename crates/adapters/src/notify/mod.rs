// SPDX-License-Identifier: MIT

//! Operator notification.
//!
//! The real delivery mechanism (email subsystem) lives outside this
//! repository; the engine only hands finished-job and agent-emitted
//! notices to a [`Notifier`].

mod log;
mod noop;

pub use log::LogNotifier;
pub use noop::NoOpNotifier;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeNotifier;

use thiserror::Error;

/// Errors from notification delivery.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("delivery failed: {0}")]
    DeliveryFailed(String),
}

/// Sink for operator-facing notices.
///
/// Calls happen on the scheduler loop, so implementations must not block;
/// anything slow belongs behind a queue inside the implementation.
pub trait Notifier: Clone + Send + Sync + 'static {
    fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError>;
}
