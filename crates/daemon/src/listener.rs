// SPDX-License-Identifier: MIT

//! Control socket listener.
//!
//! One TCP connection per admin session, one command per line. Commands
//! become events for the scheduler loop; replies are `OK`, `ERR <msg>`,
//! or a status dump ending in `end`. The listener never touches scheduler
//! state directly — it reads the published status snapshot and writes to
//! the event queue.

use dispatch_core::{Event, JobId};
use dispatch_engine::{EventQueue, StatusShare};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// One parsed admin command.
///
/// Grammar: `<word>[ <int>[ (<int> | "<string>")]]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Pause(u64),
    Restart(u64),
    Kill(u64, String),
    Status(Option<u64>),
    Reload,
    Stop,
    Close,
}

/// Parse one command line. Unknown or malformed input is an error the
/// connection replies `ERR` to; no state changes.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (line, ""),
    };

    let no_args = |rest: &str, cmd: Command| {
        if rest.is_empty() {
            Ok(cmd)
        } else {
            Err(format!("{} takes no arguments", word))
        }
    };

    match word {
        "pause" => Ok(Command::Pause(parse_id(word, rest)?)),
        "restart" => Ok(Command::Restart(parse_id(word, rest)?)),
        "kill" => {
            let (id, rest) = match rest.split_once(char::is_whitespace) {
                Some((id, rest)) => (id, rest.trim_start()),
                None => return Err("kill needs an id and a quoted message".to_string()),
            };
            let id = id
                .parse()
                .map_err(|_| format!("kill: bad job id {:?}", id))?;
            let message = rest
                .strip_prefix('"')
                .and_then(|m| m.strip_suffix('"'))
                .ok_or_else(|| "kill: message must be quoted".to_string())?;
            Ok(Command::Kill(id, message.to_string()))
        }
        "status" => {
            if rest.is_empty() {
                Ok(Command::Status(None))
            } else {
                Ok(Command::Status(Some(parse_id(word, rest)?)))
            }
        }
        "reload" => no_args(rest, Command::Reload),
        "stop" => no_args(rest, Command::Stop),
        "close" => no_args(rest, Command::Close),
        "" => Err("empty command".to_string()),
        other => Err(format!("unknown command: {}", other)),
    }
}

fn parse_id(word: &str, rest: &str) -> Result<u64, String> {
    if rest.is_empty() {
        return Err(format!("{} needs a job id", word));
    }
    rest.parse()
        .map_err(|_| format!("{}: bad job id {:?}", word, rest))
}

/// What the listener needs from the rest of the daemon.
pub struct ListenCtx {
    pub events: EventQueue,
    pub status: StatusShare,
}

/// Reply to one command line.
fn respond(line: &str, ctx: &ListenCtx) -> (String, bool) {
    let command = match parse_command(line) {
        Ok(command) => command,
        Err(e) => {
            tracing::warn!(line, error = %e, "bad control command");
            return (format!("ERR {}\n", e), false);
        }
    };
    tracing::debug!(?command, "control command");
    match command {
        Command::Pause(id) => {
            ctx.events.send(Event::JobPause { id: JobId::new(id) });
            ("OK\n".to_string(), false)
        }
        Command::Restart(id) => {
            ctx.events.send(Event::JobRestart { id: JobId::new(id) });
            ("OK\n".to_string(), false)
        }
        Command::Kill(id, message) => {
            ctx.events.send(Event::JobKill {
                id: JobId::new(id),
                message,
            });
            ("OK\n".to_string(), false)
        }
        Command::Status(id) => {
            let snapshot = ctx.status.lock().clone();
            (snapshot.render(id.map(JobId::new)), false)
        }
        Command::Reload => {
            ctx.events.send(Event::ConfigReload);
            ("OK\n".to_string(), false)
        }
        Command::Stop => {
            ctx.events.send(Event::Close { force: false });
            ("OK\n".to_string(), false)
        }
        Command::Close => ("CLOSE\n".to_string(), true),
    }
}

/// The accept loop plus per-connection tasks.
pub struct Listener {
    listener: TcpListener,
    ctx: Arc<ListenCtx>,
}

impl Listener {
    pub fn new(listener: TcpListener, ctx: Arc<ListenCtx>) -> Self {
        Self { listener, ctx }
    }

    pub async fn run(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    tracing::debug!(%peer, "control connection");
                    let ctx = Arc::clone(&self.ctx);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, ctx).await {
                            tracing::debug!(%peer, error = %e, "control connection ended");
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                }
            }
        }
    }
}

async fn handle_connection(stream: TcpStream, ctx: Arc<ListenCtx>) -> std::io::Result<()> {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let (reply, close) = respond(&line, &ctx);
        write.write_all(reply.as_bytes()).await?;
        if close {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
