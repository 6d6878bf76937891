// SPDX-License-Identifier: MIT

//! The event queue feeding the scheduler loop.
//!
//! [`EventQueue`] is the cloneable, thread-safe producer handle; every
//! reader thread, the store bridge, and the control listener hold one.
//! [`EventLoop`] is the single consumer. Immediate events are FIFO; timed
//! events sort by deadline and jump the channel when due.

use dispatch_core::Event;
use std::collections::{BinaryHeap, VecDeque};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::{Duration, Instant};

/// Upper bound on one idle wait, so the loop can run its periodic checks
/// even when nothing is happening.
pub const IDLE_WAIT: Duration = Duration::from_secs(1);

struct Queued {
    event: Event,
    due: Option<Instant>,
}

/// Thread-safe producer handle.
#[derive(Clone)]
pub struct EventQueue {
    tx: Sender<Queued>,
}

impl EventQueue {
    /// Enqueue for immediate delivery, in send order.
    pub fn send(&self, event: Event) {
        if self.tx.send(Queued { event, due: None }).is_err() {
            tracing::debug!("event dropped: loop is gone");
        }
    }

    /// Enqueue for delivery once `due` has passed.
    pub fn send_at(&self, event: Event, due: Instant) {
        if self.tx.send(Queued { event, due: Some(due) }).is_err() {
            tracing::debug!("timed event dropped: loop is gone");
        }
    }
}

struct TimedEntry {
    due: Instant,
    seq: u64,
    event: Event,
}

// BinaryHeap is a max-heap; reverse the comparison so the earliest
// deadline surfaces first. `seq` keeps same-deadline entries in send order.
impl Ord for TimedEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other.due.cmp(&self.due).then(other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for TimedEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for TimedEntry {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for TimedEntry {}

/// Single consumer owned by the loop thread.
pub struct EventLoop {
    rx: Receiver<Queued>,
    ready: VecDeque<Event>,
    timed: BinaryHeap<TimedEntry>,
    seq: u64,
}

/// Create a connected queue/loop pair.
pub fn channel() -> (EventQueue, EventLoop) {
    let (tx, rx) = mpsc::channel();
    (
        EventQueue { tx },
        EventLoop {
            rx,
            ready: VecDeque::new(),
            timed: BinaryHeap::new(),
            seq: 0,
        },
    )
}

impl EventLoop {
    /// Pop the next due event, waiting up to [`IDLE_WAIT`] when idle.
    ///
    /// Returns `None` on an idle timeout; the caller still runs its
    /// periodic work (signal drain, tick) before calling again.
    pub fn next_due(&mut self) -> Option<Event> {
        loop {
            match self.rx.try_recv() {
                Ok(queued) => self.stash(queued),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        let now = Instant::now();
        self.promote_due(now);
        if let Some(event) = self.ready.pop_front() {
            return Some(event);
        }

        let wait = self
            .timed
            .peek()
            .map(|t| t.due.saturating_duration_since(now).min(IDLE_WAIT))
            .unwrap_or(IDLE_WAIT);

        match self.rx.recv_timeout(wait) {
            Ok(queued) => self.stash(queued),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                // Producers gone; deliver whatever deadlines remain.
                std::thread::sleep(wait);
            }
        }
        self.promote_due(Instant::now());
        self.ready.pop_front()
    }

    /// Pop the next due event without waiting. For callers that interleave
    /// event handling with their own work (and for tests).
    pub fn try_next(&mut self) -> Option<Event> {
        loop {
            match self.rx.try_recv() {
                Ok(queued) => self.stash(queued),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        self.promote_due(Instant::now());
        self.ready.pop_front()
    }

    fn stash(&mut self, queued: Queued) {
        match queued.due {
            None => self.ready.push_back(queued.event),
            Some(due) => {
                self.seq += 1;
                self.timed.push(TimedEntry {
                    due,
                    seq: self.seq,
                    event: queued.event,
                });
            }
        }
    }

    fn promote_due(&mut self, now: Instant) {
        while let Some(entry) = self.timed.peek() {
            if entry.due > now {
                break;
            }
            if let Some(entry) = self.timed.pop() {
                self.ready.push_back(entry.event);
            }
        }
    }
}

#[cfg(test)]
#[path = "event_loop_tests.rs"]
mod tests;
