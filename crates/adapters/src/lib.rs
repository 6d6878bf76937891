// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dispatch-adapters: Boundary traits and implementations.
//!
//! Everything the scheduler engine touches outside its own process goes
//! through a trait defined here: spawning children ([`SpawnTransport`]),
//! the job store ([`JobStore`]), operator notification ([`Notifier`]), and
//! the configuration source ([`ConfigLoader`]). Each trait ships a
//! production implementation and, behind the `test-support` feature, a
//! scriptable fake.

pub mod config;
pub mod notify;
pub mod store;
pub mod transport;

pub use config::{
    load_snapshot, ConfigLoader, LoadError, RawConfig, StaticConfigLoader, TomlConfigLoader,
};
pub use notify::{LogNotifier, NoOpNotifier, Notifier, NotifyError};
pub use store::{JobStore, JobUpdate, MemoryJobStore, StoreError};
pub use transport::{AgentChild, ProcessTransport, SignalError, SpawnTransport, TransportError};

#[cfg(any(test, feature = "test-support"))]
pub use notify::FakeNotifier;
#[cfg(any(test, feature = "test-support"))]
pub use transport::{FakeTransport, SpawnedChild};
