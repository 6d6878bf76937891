// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn no_match_for_a_name_nothing_runs_under() {
    let pids = find_other_instances("definitely-not-a-real-process-name-xyz");
    assert!(pids.is_empty());
}

#[test]
fn the_scan_excludes_the_calling_process() {
    // Every pid found for our own binary name must differ from our pid
    let exe = std::env::current_exe().unwrap();
    let name = exe.file_name().unwrap().to_string_lossy().to_string();
    let me = std::process::id() as i32;
    assert!(!find_other_instances(&name).contains(&me));
}

#[test]
fn kill_reports_zero_for_dead_pids() {
    // A pid from the far end of the range is almost certainly unused;
    // kill must fail cleanly rather than panic.
    assert_eq!(kill_instances(&[i32::MAX - 1], false), 0);
}
