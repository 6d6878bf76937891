// SPDX-License-Identifier: MIT

use super::*;
use parking_lot::Mutex;

fn sink() -> (Box<dyn Write + Send>, Arc<Mutex<Vec<u8>>>) {
    struct Sink(Arc<Mutex<Vec<u8>>>);
    impl Write for Sink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
    let buffer = Arc::new(Mutex::new(Vec::new()));
    (Box::new(Sink(Arc::clone(&buffer))), buffer)
}

fn agent() -> (Agent, Arc<Mutex<Vec<u8>>>) {
    let (stdin, buffer) = sink();
    let meta = Arc::new(MetaAgent::new("scan", vec!["scan-agent".into()], 2));
    (
        Agent::new(
            AgentId::new("agent-1"),
            meta,
            "localhost",
            Some(JobId::new(1)),
            4242,
            stdin,
            Instant::now(),
        ),
        buffer,
    )
}

#[test]
fn send_writes_newline_terminated_orders() {
    let (mut agent, buffer) = agent();
    agent.send(&WorkOrder::Chunk { id: 17 }).unwrap();
    agent.send(&WorkOrder::Close).unwrap();
    assert_eq!(String::from_utf8_lossy(&buffer.lock()), "17\nCLOSE\n");
}

#[test]
fn send_after_close_stdin_fails() {
    let (mut agent, _) = agent();
    agent.close_stdin();
    assert!(agent.send(&WorkOrder::End).is_err());
}

#[test]
fn terminal_states_are_sticky() {
    let (mut agent, _) = agent();
    agent.set_state(AgentState::Ready);
    agent.set_state(AgentState::Failed);
    agent.set_state(AgentState::Ready);
    assert_eq!(agent.state, AgentState::Failed);
}

#[test]
fn stderr_tail_is_bounded_and_keeps_the_newest() {
    let (mut agent, _) = agent();
    for i in 0..15 {
        agent.push_stderr(format!("line {}", i));
    }
    let message = agent.stderr_message();
    assert!(!message.contains("line 4"));
    assert!(message.contains("line 5"));
    assert!(message.contains("line 14"));
}

#[test]
fn empty_stderr_yields_a_placeholder_message() {
    let (agent, _) = agent();
    assert_eq!(agent.stderr_message(), "agent produced no error output");
}
