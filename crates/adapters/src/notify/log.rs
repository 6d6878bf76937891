// SPDX-License-Identifier: MIT

//! Notifier that writes notices to the scheduler log.

use super::{Notifier, NotifyError};

/// Default notifier: every notice becomes one info-level log line. Used
/// when no mail hand-off is configured.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        tracing::info!(target: "dispatch::notify", subject, body, "notification");
        Ok(())
    }
}
