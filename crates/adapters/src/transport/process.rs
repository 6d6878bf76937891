// SPDX-License-Identifier: MIT

//! Production transport: fork-exec locally, ssh for remote hosts.

use super::{AgentChild, SignalError, SpawnTransport, TransportError};
use dispatch_core::Host;
use nix::errno::Errno;
use nix::sys::signal::Signal;
use nix::unistd::Pid;
use std::process::{Command, Stdio};

/// Spawns children with `std::process`. Local hosts exec the argv
/// directly in the host's working directory; remote hosts get the same
/// command line wrapped in an `ssh` invocation.
#[derive(Debug, Clone, Default)]
pub struct ProcessTransport;

impl ProcessTransport {
    pub fn new() -> Self {
        Self
    }

    fn build_command(host: &Host, argv: &[String]) -> Result<Command, TransportError> {
        if argv.is_empty() {
            return Err(TransportError::EmptyArgv);
        }

        if host.is_local() {
            let mut cmd = Command::new(&argv[0]);
            cmd.args(&argv[1..]);
            if !host.directory.is_empty() {
                cmd.current_dir(&host.directory);
            }
            Ok(cmd)
        } else {
            // Remote: one shell line over ssh. The child's stdin/stdout ride
            // the ssh connection, so the wire protocol is unchanged.
            let mut cmd = Command::new("ssh");
            cmd.arg(&host.address);
            let remote = if host.directory.is_empty() {
                argv.join(" ")
            } else {
                format!("cd {} && {}", host.directory, argv.join(" "))
            };
            cmd.arg(remote);
            Ok(cmd)
        }
    }
}

impl SpawnTransport for ProcessTransport {
    fn spawn(&self, host: &Host, argv: &[String]) -> Result<AgentChild, TransportError> {
        let mut cmd = Self::build_command(host, argv)?;
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| TransportError::SpawnFailed(format!("{}: {}", argv[0], e)))?;

        let pid = child.id() as i32;
        let (Some(stdin), Some(stdout), Some(stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            return Err(TransportError::SpawnFailed(
                "child spawned without piped streams".to_string(),
            ));
        };

        // The Child handle is dropped without waiting: the signal bridge
        // reaps every scheduler child through waitpid(-1).
        drop(child);

        Ok(AgentChild {
            pid,
            stdin: Box::new(stdin),
            stdout: Box::new(stdout),
            stderr: Box::new(stderr),
        })
    }

    fn signal(&self, pid: i32, signo: i32) -> Result<(), SignalError> {
        let signal = Signal::try_from(signo).map_err(|e| SignalError::Failed {
            pid,
            reason: e.to_string(),
        })?;
        match nix::sys::signal::kill(Pid::from_raw(pid), signal) {
            Ok(()) => Ok(()),
            Err(Errno::ESRCH) => Err(SignalError::NoSuchProcess(pid)),
            Err(errno) => Err(SignalError::Failed {
                pid,
                reason: errno.to_string(),
            }),
        }
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
