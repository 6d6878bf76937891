// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! dispatch-daemon: wiring for the `dispatchd` binary.
//!
//! The engine owns the scheduling semantics; this crate owns everything
//! around it: configuration loading, logging, the control socket, and the
//! single-instance guard.

pub mod guard;
pub mod listener;

pub use listener::{Listener, ListenCtx};
