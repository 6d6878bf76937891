// SPDX-License-Identifier: MIT

//! Fake notifier for deterministic testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{Notifier, NotifyError};
use parking_lot::Mutex;
use std::sync::Arc;

/// Records every notice for assertions.
#[derive(Clone, Default)]
pub struct FakeNotifier {
    notices: Arc<Mutex<Vec<(String, String)>>>,
}

impl FakeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All `(subject, body)` pairs delivered so far.
    pub fn notices(&self) -> Vec<(String, String)> {
        self.notices.lock().clone()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.notices.lock().iter().map(|(s, _)| s.clone()).collect()
    }
}

impl Notifier for FakeNotifier {
    fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        self.notices
            .lock()
            .push((subject.to_string(), body.to_string()));
        Ok(())
    }
}
