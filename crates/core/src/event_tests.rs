// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn events_round_trip_through_json() {
    let events = vec![
        Event::AgentMessage {
            agent: AgentId::new("agent-1"),
            message: AgentMessage::Heartbeat {
                done: 3,
                total: Some(10),
            },
        },
        Event::AgentDeath {
            agent: AgentId::new("agent-1"),
            pid: 4242,
            status: ExitStatus::signaled(15),
        },
        Event::Close { force: true },
        Event::ConfigReload,
    ];

    for event in events {
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}

#[test]
fn tag_matches_name() {
    let event = Event::StorePoll;
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], event.name());
}

#[test]
fn log_summary_includes_identifiers() {
    let event = Event::AgentDeath {
        agent: AgentId::new("agent-9"),
        pid: 77,
        status: ExitStatus::exited(1),
    };
    let line = event.log_summary();
    assert!(line.contains("agent-9"));
    assert!(line.contains("pid=77"));
    assert!(line.contains("code=1"));
}

#[test]
fn exit_status_success_requires_zero_exit() {
    assert!(ExitStatus::exited(0).success());
    assert!(!ExitStatus::exited(2).success());
    assert!(!ExitStatus::signaled(9).success());
}
