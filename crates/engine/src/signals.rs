// SPDX-License-Identifier: MIT

//! Signal bridge: async-signal context to synchronous events.
//!
//! Signals land as bits in an atomic mask; once per loop iteration
//! [`SignalBridge::drain`] swaps the mask to zero and translates the bits
//! into events. Bits coalesce rather than count — correct here because
//! each kind is idempotent at this level: SIGCHLD triggers a full
//! `waitpid(-1, WNOHANG)` sweep no matter how many children died.

use dispatch_core::{Event, ExitStatus};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use parking_lot::Mutex;
use signal_hook::consts::signal::{SIGALRM, SIGCHLD, SIGHUP, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const MASK_SIGCHLD: u32 = 1 << 0;
pub const MASK_SIGALRM: u32 = 1 << 1;
pub const MASK_SIGTERM: u32 = 1 << 2;
pub const MASK_SIGQUIT: u32 = 1 << 3;
pub const MASK_SIGHUP: u32 = 1 << 4;

/// The shared signal bitmask.
///
/// `raise` is a single atomic fetch-or, `swap` a single atomic exchange,
/// so no delivery is ever lost between drains.
#[derive(Clone, Default)]
pub struct SignalMask {
    bits: Arc<AtomicU32>,
}

impl SignalMask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self, bit: u32) {
        self.bits.fetch_or(bit, Ordering::SeqCst);
    }

    pub fn raise_signal(&self, signo: i32) {
        match signo {
            SIGCHLD => self.raise(MASK_SIGCHLD),
            SIGALRM => self.raise(MASK_SIGALRM),
            SIGTERM => self.raise(MASK_SIGTERM),
            SIGQUIT => self.raise(MASK_SIGQUIT),
            SIGHUP => self.raise(MASK_SIGHUP),
            _ => {}
        }
    }

    /// Take the accumulated bits and reset the mask to zero.
    pub fn swap(&self) -> u32 {
        self.bits.swap(0, Ordering::SeqCst)
    }

    /// Register the OS handlers and start the delivery thread.
    pub fn install(&self) -> std::io::Result<()> {
        let mut signals = Signals::new([SIGCHLD, SIGALRM, SIGTERM, SIGQUIT, SIGHUP])?;
        let mask = self.clone();
        std::thread::Builder::new()
            .name("dispatch-signals".to_string())
            .spawn(move || {
                for signo in signals.forever() {
                    mask.raise_signal(signo);
                }
            })?;
        Ok(())
    }
}

/// Routes reaped `(pid, status)` pairs to per-agent supervisors.
///
/// The one table shared between the drain path and agent attachment;
/// everything else stays on the loop thread.
#[derive(Clone, Default)]
pub struct ReapTable {
    inner: Arc<Mutex<HashMap<i32, Sender<ExitStatus>>>>,
}

impl ReapTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pid; the returned receiver yields its exit status once.
    pub fn register(&self, pid: i32) -> Receiver<ExitStatus> {
        let (tx, rx) = std::sync::mpsc::channel();
        self.inner.lock().insert(pid, tx);
        rx
    }

    /// Deliver a reaped status. Returns false for pids nobody registered.
    pub fn route(&self, pid: i32, status: ExitStatus) -> bool {
        match self.inner.lock().remove(&pid) {
            Some(tx) => tx.send(status).is_ok(),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

/// Drains the mask into events once per loop iteration.
pub struct SignalBridge {
    mask: SignalMask,
    reaps: ReapTable,
    update_interval: Duration,
    last_update: Instant,
}

impl SignalBridge {
    pub fn new(mask: SignalMask, reaps: ReapTable, update_interval: Duration) -> Self {
        Self {
            mask,
            reaps,
            update_interval,
            last_update: Instant::now(),
        }
    }

    /// Translate accumulated signal bits into events.
    ///
    /// SIGCHLD runs the reap sweep directly (supervisor threads then emit
    /// the `AgentDeath` events after their readers hit EOF); everything
    /// else becomes an event here. SIGALRM and the elapsed update interval
    /// both trigger the periodic `AgentUpdate` + `StorePoll` pair.
    pub fn drain(&mut self, now: Instant) -> Vec<Event> {
        let mask = self.mask.swap();
        let mut events = Vec::new();

        if mask & MASK_SIGCHLD != 0 {
            self.reap_children();
        }
        if mask & MASK_SIGTERM != 0 {
            tracing::info!("received terminate signal, shutting down gracefully");
            events.push(Event::Close { force: false });
        }
        if mask & MASK_SIGQUIT != 0 {
            tracing::info!("received quit signal, shutting down now");
            events.push(Event::Close { force: true });
        }
        if mask & MASK_SIGHUP != 0 {
            tracing::info!("received SIGHUP, reloading configuration");
            events.push(Event::ConfigReload);
        }

        let alarm = mask & MASK_SIGALRM != 0;
        if alarm || now.duration_since(self.last_update) > self.update_interval {
            events.push(Event::AgentUpdate);
            events.push(Event::StorePoll);
            self.last_update = now;
        }

        events
    }

    /// Reap every dead child in one sweep. Coalesced SIGCHLDs are covered
    /// because the loop runs until no more zombies remain.
    pub fn reap_children(&self) {
        loop {
            match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::Exited(pid, code)) => {
                    self.deliver(pid.as_raw(), ExitStatus::exited(code));
                }
                Ok(WaitStatus::Signaled(pid, signal, _)) => {
                    self.deliver(pid.as_raw(), ExitStatus::signaled(signal as i32));
                }
                Ok(WaitStatus::StillAlive) => break,
                Ok(_) => continue,
                Err(_) => break,
            }
        }
    }

    fn deliver(&self, pid: i32, status: ExitStatus) {
        tracing::debug!(pid, ?status, "reaped child");
        if !self.reaps.route(pid, status) {
            tracing::warn!(pid, "reaped a child no agent claims");
        }
    }
}

#[cfg(test)]
#[path = "signals_tests.rs"]
mod tests;
