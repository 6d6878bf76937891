// SPDX-License-Identifier: MIT

use super::*;
use yare::parameterized;

#[parameterized(
    exclusive = { "EXCLUSIVE" },
    noemail = { "NOEMAIL" },
    nokill = { "NOKILL" },
    local = { "LOCAL" },
)]
fn known_flags_parse(value: &str) {
    let mut flags = AgentFlags::default();
    flags.set(value).unwrap();
    assert_eq!(flags.to_string(), value);
}

#[test]
fn unknown_flag_is_rejected() {
    let mut flags = AgentFlags::default();
    let err = flags.set("exclusive").unwrap_err();
    assert!(err.contains("exclusive"));
    assert_eq!(flags, AgentFlags::default());
}

#[test]
fn flags_display_joins_with_pipe() {
    let mut flags = AgentFlags::default();
    flags.set("EXCLUSIVE").unwrap();
    flags.set("NOKILL").unwrap();
    assert_eq!(flags.to_string(), "EXCLUSIVE|NOKILL");
}

#[test]
fn builder_sets_timeout_and_flags() {
    let meta = MetaAgent::new("scan", vec!["scan-agent".into()], 4)
        .with_heartbeat_timeout(Duration::from_secs(60))
        .with_flags(AgentFlags {
            local: true,
            ..Default::default()
        });

    assert_eq!(meta.max_run, 4);
    assert_eq!(meta.heartbeat_timeout, Duration::from_secs(60));
    assert!(meta.flags.local);
    assert!(meta.valid);
}
