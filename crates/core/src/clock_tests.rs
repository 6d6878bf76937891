// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn fake_clock_advances_monotonic_and_epoch() {
    let clock = FakeClock::new();
    let start = clock.now();
    let epoch = clock.epoch_ms();

    clock.advance(Duration::from_secs(90));

    assert_eq!(clock.now() - start, Duration::from_secs(90));
    assert_eq!(clock.epoch_ms() - epoch, 90_000);
}

#[test]
fn fake_clock_clones_share_time() {
    let clock = FakeClock::new();
    let other = clock.clone();
    clock.advance(Duration::from_secs(5));
    assert_eq!(other.now(), clock.now());
}

#[test]
fn system_clock_is_monotonic() {
    let clock = SystemClock;
    let a = clock.now();
    let b = clock.now();
    assert!(b >= a);
}
