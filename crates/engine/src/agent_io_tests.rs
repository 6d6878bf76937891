// SPDX-License-Identifier: MIT

use super::*;
use crate::event_loop;
use dispatch_adapters::{FakeTransport, ProcessTransport, SpawnTransport};
use dispatch_core::{ExitStatus, Host, LOCAL_HOST};
use std::time::{Duration, Instant};

fn local_host() -> Host {
    Host::new(LOCAL_HOST, "localhost", "", 4, "all")
}

fn agent_id(n: u32) -> AgentId {
    AgentId::new(format!("agent-{}", n))
}

#[test]
fn stdout_lines_become_typed_message_events() {
    let (queue, mut events) = event_loop::channel();
    let reaps = ReapTable::new();
    let transport = FakeTransport::new();
    let child = transport
        .spawn(&local_host(), &["agent".to_string()])
        .unwrap();
    let handle = transport.spawned().remove(0);

    let _stdin = attach(agent_id(1), child, &queue, &reaps);
    handle.say("OK");
    handle.say("HEART: 3 9");
    handle.say("mumbling to myself");
    handle.say("ITEM 2");

    assert_eq!(
        events.next_due(),
        Some(Event::AgentMessage {
            agent: agent_id(1),
            message: AgentMessage::Ok
        })
    );
    assert_eq!(
        events.next_due(),
        Some(Event::AgentMessage {
            agent: agent_id(1),
            message: AgentMessage::Heartbeat {
                done: 3,
                total: Some(9)
            }
        })
    );
    // The unrecognized line was logged and dropped; the next event is ITEM
    assert_eq!(
        events.next_due(),
        Some(Event::AgentMessage {
            agent: agent_id(1),
            message: AgentMessage::Item { count: 2 }
        })
    );
}

#[test]
fn stderr_lines_become_stderr_events() {
    let (queue, mut events) = event_loop::channel();
    let reaps = ReapTable::new();
    let transport = FakeTransport::new();
    let child = transport
        .spawn(&local_host(), &["agent".to_string()])
        .unwrap();
    let handle = transport.spawned().remove(0);

    let _stdin = attach(agent_id(2), child, &queue, &reaps);
    handle.say_stderr("cannot open archive");

    assert_eq!(
        events.next_due(),
        Some(Event::AgentStderr {
            agent: agent_id(2),
            line: "cannot open archive".to_string()
        })
    );
}

#[test]
fn death_arrives_after_all_output_events() {
    let (queue, mut events) = event_loop::channel();
    let reaps = ReapTable::new();
    let transport = FakeTransport::new();
    let child = transport
        .spawn(&local_host(), &["agent".to_string()])
        .unwrap();
    let pid = child.pid;
    let handle = transport.spawned().remove(0);

    let _stdin = attach(agent_id(3), child, &queue, &reaps);
    handle.say("BYE 0");
    // Route the reap before the streams close: the supervisor must still
    // hold the death marker until both readers hit EOF.
    assert!(reaps.route(pid, ExitStatus::exited(0)));
    handle.say("LOG one last line");
    handle.close_streams();

    assert_eq!(
        events.next_due(),
        Some(Event::AgentMessage {
            agent: agent_id(3),
            message: AgentMessage::Bye { code: 0 }
        })
    );
    assert_eq!(
        events.next_due(),
        Some(Event::AgentMessage {
            agent: agent_id(3),
            message: AgentMessage::Log {
                text: "one last line".to_string()
            }
        })
    );
    assert_eq!(
        events.next_due(),
        Some(Event::AgentDeath {
            agent: agent_id(3),
            pid,
            status: ExitStatus::exited(0)
        })
    );
}

#[test]
#[serial_test::serial(reaping)]
fn real_children_flow_from_sigchld_sweep_to_death_events() {
    let (queue, mut events) = event_loop::channel();
    let reaps = ReapTable::new();
    let transport = ProcessTransport::new();

    // Two children that speak one line and exit; SIGCHLD coalesces into a
    // single sweep that must still produce both death events.
    let mut pids = Vec::new();
    for n in [1, 2] {
        let child = transport
            .spawn(
                &local_host(),
                &[
                    "sh".to_string(),
                    "-c".to_string(),
                    format!("echo OK; exit {}", n),
                ],
            )
            .unwrap();
        pids.push(child.pid);
        attach(agent_id(n as u32), child, &queue, &reaps);
    }

    std::thread::sleep(Duration::from_millis(300));
    let bridge = crate::signals::SignalBridge::new(
        crate::signals::SignalMask::new(),
        reaps.clone(),
        Duration::from_secs(3600),
    );
    bridge.reap_children();

    let deadline = Instant::now() + Duration::from_secs(5);
    let mut deaths = Vec::new();
    while deaths.len() < 2 && Instant::now() < deadline {
        match events.next_due() {
            Some(Event::AgentDeath { pid, status, .. }) => deaths.push((pid, status)),
            Some(_) => {}
            None => {}
        }
    }

    assert_eq!(deaths.len(), 2);
    for (n, pid) in pids.iter().enumerate() {
        let (_, status) = deaths.iter().find(|(p, _)| p == pid).unwrap();
        assert_eq!(status.code, Some(n as i32 + 1));
    }
}
