//! Companion process control

use async_trait::async_trait;
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use tokio::process::Command;
use tracing::{debug, warn};

use tether_host_api::{CompanionControl, HostError, HostResult};

/// Spawns and stops the companion process.
///
/// The companion is started through the shell with the per-device
/// argument string appended, in its own session so the whole process
/// group can be signalled on stop. A reaper task waits on the child to
/// avoid zombies and clears the stored group id once it exits on its
/// own.
pub struct CompanionProcess {
    command: String,
    pgid: Arc<Mutex<Option<u32>>>,
}

impl CompanionProcess {
    /// `command` is the companion invocation prefix, e.g. `moonlight-qt`.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            pgid: Arc::new(Mutex::new(None)),
        }
    }
}

#[async_trait]
impl CompanionControl for CompanionProcess {
    async fn launch(&self, args: &str) -> HostResult<()> {
        let invocation = if args.is_empty() {
            self.command.clone()
        } else {
            format!("{} {}", self.command, args)
        };

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&invocation)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        // New session so stop can signal the whole group.
        // SAFETY: setsid is async-signal-safe in the pre-exec context.
        unsafe {
            cmd.pre_exec(|| {
                nix::unistd::setsid()
                    .map(|_| ())
                    .map_err(|e| std::io::Error::other(e.to_string()))
            });
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| HostError::SpawnFailed(format!("{invocation}: {e}")))?;

        let pid = child
            .id()
            .ok_or_else(|| HostError::SpawnFailed("child exited before spawn returned".into()))?;

        debug!(pid, invocation = %invocation, "Companion process spawned");
        *self.pgid.lock().unwrap() = Some(pid); // after setsid, pid == pgid

        // Reap the child and forget the group once it exits on its own.
        let pgid_slot = self.pgid.clone();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => debug!(pid, %status, "Companion process exited"),
                Err(e) => warn!(pid, error = %e, "Failed to wait on companion process"),
            }
            let mut slot = pgid_slot.lock().unwrap();
            if *slot == Some(pid) {
                *slot = None;
            }
        });

        Ok(())
    }

    async fn terminate(&self) -> HostResult<()> {
        let Some(pgid) = self.pgid.lock().unwrap().take() else {
            debug!("No companion process group recorded, nothing to stop");
            return Ok(());
        };

        // Negative pid signals the whole process group.
        match signal::kill(Pid::from_raw(-(pgid as i32)), Signal::SIGTERM) {
            Ok(()) => {
                debug!(pgid, "Sent SIGTERM to companion process group");
                Ok(())
            }
            // Already gone: stopping an exited companion succeeds silently.
            Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(HostError::StopFailed(format!(
                "Failed to signal process group {pgid}: {e}"
            ))),
        }
    }
}
