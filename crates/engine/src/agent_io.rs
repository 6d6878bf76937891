// SPDX-License-Identifier: MIT

//! Per-agent I/O: reader threads and the death supervisor.
//!
//! Each spawned child gets three helper threads. Two read stdout and
//! stderr line by line and post typed events; the third joins both
//! readers, then waits for the reap status routed from the SIGCHLD sweep,
//! then posts `AgentDeath`. The join-before-death order guarantees that a
//! death event is always delivered after every output event parsed from
//! the child's streams.

use crate::event_loop::EventQueue;
use crate::signals::ReapTable;
use dispatch_adapters::AgentChild;
use dispatch_core::{AgentId, AgentMessage, Event};
use std::io::{BufRead, BufReader, Read, Write};

/// Wire up reader threads and the supervisor for a fresh child.
///
/// Returns the child's stdin writer, which stays with the scheduler.
pub fn attach(
    agent: AgentId,
    child: AgentChild,
    events: &EventQueue,
    reaps: &ReapTable,
) -> Box<dyn Write + Send> {
    let AgentChild {
        pid,
        stdin,
        stdout,
        stderr,
    } = child;

    let reap_rx = reaps.register(pid);

    let stdout_handle = spawn_reader("stdout", &agent, stdout, {
        let events = events.clone();
        let agent = agent.clone();
        move |line| match AgentMessage::parse(&line) {
            Some(message) => events.send(Event::AgentMessage {
                agent: agent.clone(),
                message,
            }),
            None => {
                if !line.trim().is_empty() {
                    tracing::info!(agent = %agent, line, "unrecognized agent line");
                }
            }
        }
    });

    let stderr_handle = spawn_reader("stderr", &agent, stderr, {
        let events = events.clone();
        let agent = agent.clone();
        move |line| {
            events.send(Event::AgentStderr {
                agent: agent.clone(),
                line,
            })
        }
    });

    let events = events.clone();
    let supervisor = std::thread::Builder::new()
        .name(format!("agent-{}-super", agent))
        .spawn(move || {
            // Readers drain to EOF before the death marker goes out.
            for handle in [stdout_handle, stderr_handle].into_iter().flatten() {
                let _ = handle.join();
            }
            match reap_rx.recv() {
                Ok(status) => events.send(Event::AgentDeath { agent, pid, status }),
                Err(_) => tracing::debug!(agent = %agent, pid, "reap channel closed before death"),
            }
        });
    if let Err(e) = supervisor {
        tracing::error!(pid, error = %e, "failed to start agent supervisor thread");
    }

    stdin
}

fn spawn_reader(
    stream: &str,
    agent: &AgentId,
    source: Box<dyn Read + Send>,
    mut sink: impl FnMut(String) + Send + 'static,
) -> Option<std::thread::JoinHandle<()>> {
    let name = format!("agent-{}-{}", agent, stream);
    let builder = std::thread::Builder::new().name(name);
    let agent = agent.clone();
    let stream_name = stream.to_string();
    match builder.spawn(move || {
        let reader = BufReader::new(source);
        for line in reader.lines() {
            match line {
                Ok(line) => sink(line),
                Err(e) => {
                    tracing::debug!(agent = %agent, stream = stream_name, error = %e, "agent stream read error");
                    break;
                }
            }
        }
    }) {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::error!(stream, error = %e, "failed to start agent reader thread");
            None
        }
    }
}

#[cfg(test)]
#[path = "agent_io_tests.rs"]
mod tests;
