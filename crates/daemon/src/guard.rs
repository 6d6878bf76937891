// SPDX-License-Identifier: MIT

//! Single-instance guard.
//!
//! Two schedulers against one store would double-run jobs, so startup
//! scans the process table for another instance first. With `--kill` or
//! `--force-kill` the found instances are signaled instead.

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use sysinfo::{ProcessesToUpdate, System};

/// Pids of other processes whose name or command line mentions `name`.
pub fn find_other_instances(name: &str) -> Vec<i32> {
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);
    let me = std::process::id();

    let mut pids: Vec<i32> = system
        .processes()
        .iter()
        .filter(|(pid, process)| {
            if pid.as_u32() == me {
                return false;
            }
            process.name().to_string_lossy().contains(name)
                || process
                    .cmd()
                    .first()
                    .is_some_and(|arg| arg.to_string_lossy().contains(name))
        })
        .map(|(pid, _)| pid.as_u32() as i32)
        .collect();
    pids.sort_unstable();
    pids
}

/// Signal every found instance: SIGTERM for a graceful stop, SIGQUIT for
/// a forced one. Returns how many were signaled.
pub fn kill_instances(pids: &[i32], force: bool) -> usize {
    let signal = if force {
        Signal::SIGQUIT
    } else {
        Signal::SIGTERM
    };
    let mut signaled = 0;
    for pid in pids {
        tracing::info!(pid, %signal, "signaling running scheduler");
        match kill(Pid::from_raw(*pid), signal) {
            Ok(()) => signaled += 1,
            Err(errno) => tracing::warn!(pid, %errno, "could not signal scheduler"),
        }
    }
    signaled
}

#[cfg(test)]
#[path = "guard_tests.rs"]
mod tests;
