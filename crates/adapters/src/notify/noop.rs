// SPDX-License-Identifier: MIT

//! Notifier that drops every notice.

use super::{Notifier, NotifyError};

/// Discards notifications entirely.
#[derive(Debug, Clone, Default)]
pub struct NoOpNotifier;

impl Notifier for NoOpNotifier {
    fn notify(&self, _subject: &str, _body: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}
