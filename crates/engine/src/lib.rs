// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dispatch-engine: The event-driven supervision engine.
//!
//! A single loop thread owns every registry. Producers — the signal
//! bridge, per-agent reader threads, the store bridge, the control
//! listener — communicate with it exclusively by enqueuing
//! [`dispatch_core::Event`]s. After every handled event the scheduler
//! tick runs and makes placement decisions.

pub mod agent;
mod agent_io;
pub mod error;
pub mod event_loop;
pub mod hosts;
pub mod metas;
pub mod queue;
pub mod scheduler;
pub mod signals;
pub mod status;
pub mod store_bridge;

pub use error::EngineError;
pub use event_loop::{EventLoop, EventQueue};
pub use scheduler::{Scheduler, SchedulerDeps};
pub use signals::{ReapTable, SignalBridge, SignalMask};
pub use status::{StatusShare, StatusSnapshot};
pub use store_bridge::{spawn_store_bridge, StoreHandle};
