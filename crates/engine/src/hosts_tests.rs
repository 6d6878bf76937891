// SPDX-License-Identifier: MIT

use super::*;

fn host(name: &str, max: u32) -> Host {
    Host::new(name, name, "/srv/dispatch", max, "all")
}

fn registry(specs: &[(&str, u32)]) -> HostRegistry {
    let mut reg = HostRegistry::new();
    reg.replace_all(specs.iter().map(|(n, m)| host(n, *m)).collect());
    reg
}

#[test]
fn next_free_walks_round_robin() {
    let mut reg = registry(&[("a", 2), ("b", 2), ("c", 2)]);

    assert_eq!(reg.next_free().as_deref(), Some("a"));
    assert_eq!(reg.next_free().as_deref(), Some("b"));
    assert_eq!(reg.next_free().as_deref(), Some("c"));
    assert_eq!(reg.next_free().as_deref(), Some("a"));
}

#[test]
fn next_free_skips_full_hosts() {
    let mut reg = registry(&[("a", 1), ("b", 1)]);
    reg.increment("a");

    assert_eq!(reg.next_free().as_deref(), Some("b"));
    reg.increment("b");
    assert_eq!(reg.next_free(), None);
}

#[test]
fn empty_registry_has_no_free_host() {
    let mut reg = HostRegistry::new();
    assert_eq!(reg.next_free(), None);
}

#[test]
fn counters_track_running_totals() {
    let mut reg = registry(&[("a", 3), ("b", 3)]);
    reg.increment("a");
    reg.increment("a");
    reg.increment("b");
    assert_eq!(reg.total_running(), 3);

    reg.decrement("a");
    assert_eq!(reg.get("a").unwrap().running, 1);
    assert_eq!(reg.total_running(), 2);
}

#[test]
fn decrement_never_underflows() {
    let mut reg = registry(&[("a", 1)]);
    reg.decrement("a");
    assert_eq!(reg.get("a").unwrap().running, 0);
}

#[test]
fn replace_all_carries_running_counts_by_name() {
    let mut reg = registry(&[("a", 2), ("b", 2)]);
    reg.increment("a");

    reg.replace_all(vec![host("a", 5), host("c", 1)]);

    assert_eq!(reg.get("a").unwrap().running, 1);
    assert_eq!(reg.get("a").unwrap().max, 5);
    assert!(reg.get("c").is_some());
    assert!(reg.get("b").is_none());
}

#[test]
fn removed_host_with_live_agents_is_retained_at_zero_max() {
    let mut reg = registry(&[("a", 2), ("b", 2)]);
    reg.increment("b");

    reg.replace_all(vec![host("a", 2)]);

    let b = reg.get("b").unwrap();
    assert_eq!(b.running, 1);
    assert_eq!(b.max, 0);
    assert!(!b.has_capacity());

    // Once the last agent drains it can be dropped by the next reload
    reg.decrement("b");
    reg.replace_all(vec![host("a", 2)]);
    assert!(reg.get("b").is_none());
}
