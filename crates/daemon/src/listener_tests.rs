// SPDX-License-Identifier: MIT

use super::*;
use dispatch_engine::{event_loop, StatusSnapshot};
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

#[test]
fn well_formed_commands_parse() {
    assert_eq!(parse_command("pause 10"), Ok(Command::Pause(10)));
    assert_eq!(parse_command("restart 3"), Ok(Command::Restart(3)));
    assert_eq!(
        parse_command("kill 10 \"hello world\""),
        Ok(Command::Kill(10, "hello world".to_string()))
    );
    assert_eq!(parse_command("status"), Ok(Command::Status(None)));
    assert_eq!(parse_command("status 7"), Ok(Command::Status(Some(7))));
    assert_eq!(parse_command("reload"), Ok(Command::Reload));
    assert_eq!(parse_command("stop"), Ok(Command::Stop));
    assert_eq!(parse_command("close"), Ok(Command::Close));
}

#[test]
fn malformed_commands_are_rejected() {
    assert!(parse_command("pause").is_err());
    assert!(parse_command("pause ten").is_err());
    assert!(parse_command("kill 10").is_err());
    assert!(parse_command("kill 10 unquoted").is_err());
    assert!(parse_command("kill \"hello\" 10").is_err());
    assert!(parse_command("stop now").is_err());
    assert!(parse_command("levitate").is_err());
    assert!(parse_command("").is_err());
}

#[test]
fn parse_tolerates_surrounding_whitespace() {
    assert_eq!(parse_command("  pause   12  "), Ok(Command::Pause(12)));
}

fn test_ctx() -> (Arc<ListenCtx>, dispatch_engine::EventLoop) {
    let (events, event_loop) = event_loop::channel();
    let ctx = Arc::new(ListenCtx {
        events,
        status: Arc::new(Mutex::new(StatusSnapshot::default())),
    });
    (ctx, event_loop)
}

#[test]
fn mutating_commands_enqueue_events_and_reply_ok() {
    let (ctx, mut events) = test_ctx();

    assert_eq!(respond("pause 4", &ctx), ("OK\n".to_string(), false));
    assert_eq!(respond("kill 5 \"why\"", &ctx), ("OK\n".to_string(), false));
    assert_eq!(respond("stop", &ctx), ("OK\n".to_string(), false));

    assert_eq!(
        events.try_next(),
        Some(Event::JobPause { id: JobId::new(4) })
    );
    assert_eq!(
        events.try_next(),
        Some(Event::JobKill {
            id: JobId::new(5),
            message: "why".to_string()
        })
    );
    assert_eq!(events.try_next(), Some(Event::Close { force: false }));
}

#[test]
fn bad_commands_reply_err_and_change_nothing() {
    let (ctx, mut events) = test_ctx();
    let (reply, close) = respond("levitate 4", &ctx);
    assert!(reply.starts_with("ERR "));
    assert!(!close);
    assert_eq!(events.try_next(), None);
}

#[test]
fn status_renders_the_published_snapshot() {
    let (ctx, _events) = test_ctx();
    ctx.status.lock().queued = 3;
    let (reply, _) = respond("status", &ctx);
    assert!(reply.contains("queued:3"));
    assert!(reply.ends_with("end\n"));
}

#[tokio::test]
async fn socket_round_trip() {
    let (ctx, _events) = test_ctx();
    let tcp = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = tcp.local_addr().unwrap();
    tokio::spawn(Listener::new(tcp, ctx).run());

    let stream = TcpStream::connect(addr).await.unwrap();
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();

    write.write_all(b"status\n").await.unwrap();
    let mut saw_end = false;
    while let Some(line) = lines.next_line().await.unwrap() {
        if line == "end" {
            saw_end = true;
            break;
        }
    }
    assert!(saw_end);

    write.write_all(b"pause 1\n").await.unwrap();
    assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("OK"));

    write.write_all(b"close\n").await.unwrap();
    assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("CLOSE"));
    // Server closes the connection after CLOSE
    assert_eq!(lines.next_line().await.unwrap(), None);
}
