// SPDX-License-Identifier: MIT

//! Fake transport for deterministic testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{AgentChild, SignalError, SpawnTransport, TransportError};
use dispatch_core::Host;
use parking_lot::Mutex;
use std::io::{Read, Write};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

/// Fake spawn transport.
///
/// Records every spawn and hands the test a [`SpawnedChild`] handle that
/// scripts the child's stdout/stderr and inspects what the scheduler wrote
/// to its stdin. Streams stay open until the test closes them, so a fake
/// agent can sit "live" for as long as a scenario needs.
#[derive(Clone, Default)]
pub struct FakeTransport {
    inner: Arc<Mutex<FakeTransportState>>,
}

#[derive(Default)]
struct FakeTransportState {
    spawned: Vec<SpawnedChild>,
    signals: Vec<(i32, i32)>,
    fail_remaining: u32,
    fail_reason: String,
    next_pid: i32,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// All children spawned so far, in spawn order.
    pub fn spawned(&self) -> Vec<SpawnedChild> {
        self.inner.lock().spawned.clone()
    }

    pub fn spawn_count(&self) -> usize {
        self.inner.lock().spawned.len()
    }

    /// Make the next spawn fail with the given reason.
    pub fn fail_next_spawn(&self, reason: impl Into<String>) {
        self.fail_spawns(1, reason);
    }

    /// Make the next `n` spawns fail with the given reason.
    pub fn fail_spawns(&self, n: u32, reason: impl Into<String>) {
        let mut state = self.inner.lock();
        state.fail_remaining = n;
        state.fail_reason = reason.into();
    }

    /// All `(pid, signo)` pairs delivered so far.
    pub fn signals(&self) -> Vec<(i32, i32)> {
        self.inner.lock().signals.clone()
    }

    /// Signals delivered to one pid.
    pub fn signals_for(&self, pid: i32) -> Vec<i32> {
        self.inner
            .lock()
            .signals
            .iter()
            .filter(|(p, _)| *p == pid)
            .map(|(_, signo)| *signo)
            .collect()
    }
}

impl SpawnTransport for FakeTransport {
    fn spawn(&self, host: &Host, argv: &[String]) -> Result<AgentChild, TransportError> {
        let mut state = self.inner.lock();
        if state.fail_remaining > 0 {
            state.fail_remaining -= 1;
            return Err(TransportError::SpawnFailed(state.fail_reason.clone()));
        }
        if argv.is_empty() {
            return Err(TransportError::EmptyArgv);
        }

        state.next_pid += 1;
        let pid = 40_000 + state.next_pid;

        let (stdout_tx, stdout_rx) = mpsc::channel();
        let (stderr_tx, stderr_rx) = mpsc::channel();
        let stdin = Arc::new(Mutex::new(Vec::new()));

        let handle = SpawnedChild {
            pid,
            host: host.name.clone(),
            argv: argv.to_vec(),
            stdout: Arc::new(Mutex::new(Some(stdout_tx))),
            stderr: Arc::new(Mutex::new(Some(stderr_tx))),
            stdin: Arc::clone(&stdin),
        };
        state.spawned.push(handle.clone());

        Ok(AgentChild {
            pid,
            stdin: Box::new(StdinSink(stdin)),
            stdout: Box::new(PipeReader::new(stdout_rx)),
            stderr: Box::new(PipeReader::new(stderr_rx)),
        })
    }

    fn signal(&self, pid: i32, signo: i32) -> Result<(), SignalError> {
        let mut state = self.inner.lock();
        if !state.spawned.iter().any(|c| c.pid == pid) {
            return Err(SignalError::NoSuchProcess(pid));
        }
        state.signals.push((pid, signo));
        Ok(())
    }
}

/// Test-side handle to one fake child.
#[derive(Clone)]
pub struct SpawnedChild {
    pub pid: i32,
    pub host: String,
    pub argv: Vec<String>,
    stdout: Arc<Mutex<Option<Sender<Vec<u8>>>>>,
    stderr: Arc<Mutex<Option<Sender<Vec<u8>>>>>,
    stdin: Arc<Mutex<Vec<u8>>>,
}

impl SpawnedChild {
    /// Emit one protocol line on the child's stdout.
    pub fn say(&self, line: &str) {
        if let Some(tx) = self.stdout.lock().as_ref() {
            let _ = tx.send(format!("{}\n", line).into_bytes());
        }
    }

    /// Emit one line on the child's stderr.
    pub fn say_stderr(&self, line: &str) {
        if let Some(tx) = self.stderr.lock().as_ref() {
            let _ = tx.send(format!("{}\n", line).into_bytes());
        }
    }

    /// Close both output streams, as a dying child would.
    pub fn close_streams(&self) {
        self.stdout.lock().take();
        self.stderr.lock().take();
    }

    /// Lines the scheduler has written to the child's stdin so far.
    pub fn stdin_lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.stdin.lock())
            .lines()
            .map(String::from)
            .collect()
    }
}

/// Blocking reader over an in-memory byte channel. EOF once the sender is
/// dropped and the buffer drains.
struct PipeReader {
    rx: Receiver<Vec<u8>>,
    pending: Vec<u8>,
}

impl PipeReader {
    fn new(rx: Receiver<Vec<u8>>) -> Self {
        Self {
            rx,
            pending: Vec::new(),
        }
    }
}

impl Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.pending.is_empty() {
            match self.rx.recv() {
                Ok(bytes) => self.pending = bytes,
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

/// Write half that appends into a shared buffer the test can inspect.
struct StdinSink(Arc<Mutex<Vec<u8>>>);

impl Write for StdinSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
