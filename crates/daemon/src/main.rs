// SPDX-License-Identifier: MIT

//! Dispatch scheduler daemon (dispatchd)
//!
//! Long-running process that owns the scheduler loop and dispatches jobs
//! to agents.
//!
//! Architecture:
//! - Listener task: control socket I/O, emits events to the loop
//! - Store bridge task: owns the job store, polls and writes status
//! - Scheduler loop: a dedicated thread processing events sequentially

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use dispatch_adapters::{
    load_snapshot, LogNotifier, MemoryJobStore, ProcessTransport, TomlConfigLoader,
};
use dispatch_core::SystemClock;
use dispatch_daemon::{guard, ListenCtx, Listener};
use dispatch_engine::{
    event_loop, spawn_store_bridge, ReapTable, Scheduler, SchedulerDeps, SignalBridge, SignalMask,
    StatusShare, StatusSnapshot,
};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Name other instances are recognized by in the process table.
const SCHEDULER_NAME: &str = "dispatchd";

/// Log file inside the configured log directory.
const LOG_FILE: &str = "dispatchd.log";

const DEFAULT_CONFIG_DIR: &str = "/etc/dispatch";

/// Wait after signaling a running scheduler before re-scanning.
const GUARD_RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
struct Args {
    config_dir: PathBuf,
    port: Option<u16>,
    kill: bool,
    force_kill: bool,
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut parsed = Args {
        config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
        port: None,
        kill: false,
        force_kill: false,
    };
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let value = iter.next().ok_or("--config needs a directory")?;
                parsed.config_dir = PathBuf::from(value);
            }
            "--port" | "-p" => {
                let value = iter.next().ok_or("--port needs a port number")?;
                parsed.port = Some(
                    value
                        .parse()
                        .map_err(|_| format!("bad port number: {}", value))?,
                );
            }
            "--kill" | "-k" => parsed.kill = true,
            "--force-kill" | "-K" => parsed.force_kill = true,
            other => return Err(format!("unexpected argument '{}'", other)),
        }
    }
    Ok(parsed)
}

fn print_help() {
    println!("dispatchd {}", env!("CARGO_PKG_VERSION"));
    println!("Dispatch scheduler daemon - supervises agents working on queued jobs");
    println!();
    println!("USAGE:");
    println!("    dispatchd [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <DIR>   Configuration directory (default: {DEFAULT_CONFIG_DIR})");
    println!("    -p, --port <PORT>    Override the control socket port");
    println!("    -k, --kill           Ask a running scheduler to stop, then exit");
    println!("    -K, --force-kill     Force a running scheduler down, then exit");
    println!("    -h, --help           Print help information");
    println!("    -v, --version        Print version information");
}

#[tokio::main]
async fn main() {
    // Handle info flags before any config or guard work
    let raw: Vec<String> = std::env::args().skip(1).collect();
    if raw.iter().any(|a| a == "--version" || a == "-V" || a == "-v") {
        println!("dispatchd {}", env!("CARGO_PKG_VERSION"));
        return;
    }
    if raw.iter().any(|a| a == "--help" || a == "-h" || a == "help") {
        print_help();
        return;
    }

    std::process::exit(run(&raw).await);
}

async fn run(raw: &[String]) -> i32 {
    let args = match parse_args(raw) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!("Usage: dispatchd [--config <dir>] [--port <n>] [--kill | --force-kill]");
            return 1;
        }
    };

    // Single-instance guard: one scheduler per store. With a kill flag
    // the found instances are signaled and startup retries once they are
    // gone.
    let mut others = guard::find_other_instances(SCHEDULER_NAME);
    if !others.is_empty() && (args.kill || args.force_kill) {
        guard::kill_instances(&others, args.force_kill);
        tokio::time::sleep(GUARD_RETRY_DELAY).await;
        others = guard::find_other_instances(SCHEDULER_NAME);
    }
    if !others.is_empty() {
        eprintln!("dispatchd is already running");
        for pid in &others {
            eprintln!("  pid: {pid}");
        }
        return 2;
    }

    // Configuration is fatal at boot; reloads later keep the old snapshot.
    let loader = TomlConfigLoader::new(&args.config_dir);
    let mut snapshot = match load_snapshot(&loader) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            eprintln!("FATAL: {e}");
            return 1;
        }
    };
    if let Some(port) = args.port {
        snapshot.knobs.port = port;
    }

    let _log_guard = setup_logging(snapshot.knobs.log_dir.as_deref());
    info!(config_dir = %args.config_dir.display(), "starting dispatchd");

    // Plumbing: event queue, signal bridge, store bridge, status share.
    let (events, event_loop) = event_loop::channel();
    let reaps = ReapTable::new();
    let mask = SignalMask::new();
    if let Err(e) = mask.install() {
        error!(error = %e, "cannot install signal handlers");
        return 1;
    }
    let bridge = SignalBridge::new(
        mask,
        reaps.clone(),
        snapshot.knobs.agent_update_interval,
    );
    let status: StatusShare = Arc::new(Mutex::new(StatusSnapshot::default()));
    let store = Arc::new(MemoryJobStore::new());
    let store_handle = spawn_store_bridge(store, events.clone());

    // Control socket.
    let port = snapshot.knobs.port;
    let tcp = match TcpListener::bind(("0.0.0.0", port)).await {
        Ok(tcp) => tcp,
        Err(e) => {
            error!(port, error = %e, "cannot bind control socket");
            return 1;
        }
    };
    let ctx = Arc::new(ListenCtx {
        events: events.clone(),
        status: Arc::clone(&status),
    });
    tokio::spawn(Listener::new(tcp, ctx).run());

    // The scheduler owns a dedicated thread; everything else talks to it
    // through the event queue.
    let mut scheduler = Scheduler::new(SchedulerDeps {
        transport: Arc::new(ProcessTransport::new()),
        notifier: LogNotifier,
        clock: SystemClock,
        store: store_handle,
        loader: Box::new(loader),
        events,
        reaps,
        status,
    });
    scheduler.apply_config(snapshot, true);
    info!(port, "dispatchd ready");

    let outcome = tokio::task::spawn_blocking(move || {
        scheduler.run(event_loop, bridge);
    })
    .await;
    match outcome {
        Ok(()) => {
            info!("dispatchd stopped");
            0
        }
        Err(e) => {
            error!(error = %e, "scheduler loop panicked");
            1
        }
    }
}

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep.
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate the daemon log if it exceeds [`MAX_LOG_SIZE`].
///
/// Shifts `dispatchd.log` -> `.1` -> `.2` -> `.3`, deleting the oldest.
/// Best-effort: rotation failures never stop the daemon.
fn rotate_log_if_needed(log_path: &Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };
    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }
    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

fn setup_logging(log_dir: Option<&Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match log_dir {
        Some(dir) => {
            if let Err(e) = std::fs::create_dir_all(dir) {
                eprintln!("cannot create log directory {}: {e}", dir.display());
            }
            rotate_log_if_needed(&dir.join(LOG_FILE));
            let appender = tracing_appender::rolling::never(dir, LOG_FILE);
            let (non_blocking, log_guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                .init();
            Some(log_guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .init();
            None
        }
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
