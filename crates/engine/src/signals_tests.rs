// SPDX-License-Identifier: MIT

use super::*;
use std::process::Command;

fn bridge_with(mask: SignalMask, reaps: ReapTable) -> SignalBridge {
    SignalBridge::new(mask, reaps, Duration::from_secs(3600))
}

#[test]
fn coalesced_raises_keep_the_bit() {
    let mask = SignalMask::new();
    mask.raise(MASK_SIGCHLD);
    mask.raise(MASK_SIGCHLD);
    mask.raise(MASK_SIGTERM);

    let bits = mask.swap();
    assert_eq!(bits & MASK_SIGCHLD, MASK_SIGCHLD);
    assert_eq!(bits & MASK_SIGTERM, MASK_SIGTERM);
    assert_eq!(bits & MASK_SIGQUIT, 0);

    // The swap cleared everything
    assert_eq!(mask.swap(), 0);
}

#[test]
fn raise_between_swaps_is_never_lost() {
    let mask = SignalMask::new();
    mask.raise(MASK_SIGCHLD);
    assert_eq!(mask.swap() & MASK_SIGCHLD, MASK_SIGCHLD);

    mask.raise(MASK_SIGCHLD);
    assert_eq!(mask.swap() & MASK_SIGCHLD, MASK_SIGCHLD);
}

#[test]
fn drain_translates_shutdown_signals() {
    let mask = SignalMask::new();
    let mut bridge = bridge_with(mask.clone(), ReapTable::new());

    mask.raise(MASK_SIGTERM);
    let events = bridge.drain(Instant::now());
    assert_eq!(events, vec![Event::Close { force: false }]);

    mask.raise(MASK_SIGQUIT);
    let events = bridge.drain(Instant::now());
    assert_eq!(events, vec![Event::Close { force: true }]);

    mask.raise(MASK_SIGHUP);
    let events = bridge.drain(Instant::now());
    assert_eq!(events, vec![Event::ConfigReload]);
}

#[test]
fn elapsed_interval_emits_update_and_poll() {
    let mask = SignalMask::new();
    let mut bridge = SignalBridge::new(mask, ReapTable::new(), Duration::from_secs(30));

    let quiet = bridge.drain(Instant::now());
    assert!(quiet.is_empty());

    let later = Instant::now() + Duration::from_secs(31);
    let events = bridge.drain(later);
    assert_eq!(events, vec![Event::AgentUpdate, Event::StorePoll]);

    // Interval restarts from the drain that fired
    assert!(bridge.drain(later + Duration::from_secs(1)).is_empty());
}

#[test]
fn sigalrm_is_equivalent_to_the_periodic_tick() {
    let mask = SignalMask::new();
    let mut bridge = SignalBridge::new(mask.clone(), ReapTable::new(), Duration::from_secs(3600));

    mask.raise(MASK_SIGALRM);
    let events = bridge.drain(Instant::now());
    assert_eq!(events, vec![Event::AgentUpdate, Event::StorePoll]);
}

// waitpid(-1) is process-global, so tests that spawn real children must
// not overlap with each other.
#[test]
#[serial_test::serial(reaping)]
fn one_sweep_reaps_every_dead_child() {
    let reaps = ReapTable::new();
    let mask = SignalMask::new();
    let mut bridge = bridge_with(mask.clone(), reaps.clone());

    let mut receivers = Vec::new();
    for code in [3, 4] {
        let child = Command::new("sh")
            .arg("-c")
            .arg(format!("exit {}", code))
            .spawn()
            .unwrap();
        receivers.push((code, reaps.register(child.id() as i32)));
        // Child handle dropped without waiting: the sweep owns reaping
    }

    // Both children exit promptly; SIGCHLD fired (at least) twice and
    // coalesced into one bit.
    std::thread::sleep(Duration::from_millis(300));
    mask.raise(MASK_SIGCHLD);
    mask.raise(MASK_SIGCHLD);
    bridge.drain(Instant::now());

    for (code, rx) in receivers {
        let status = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(status.code, Some(code));
    }
    assert!(reaps.is_empty());
}

#[test]
fn route_to_unknown_pid_reports_false() {
    let reaps = ReapTable::new();
    assert!(!reaps.route(99999, ExitStatus::exited(0)));

    let rx = reaps.register(12345);
    assert!(reaps.route(12345, ExitStatus::signaled(9)));
    assert_eq!(rx.try_recv().unwrap().signal, Some(9));
}
