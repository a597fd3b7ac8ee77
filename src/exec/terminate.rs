// src/exec/terminate.rs

//! Best-effort termination of a run's whole process tree.

use tracing::{debug, warn};

/// What a terminate request actually did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminateOutcome {
    /// The process group (or OS-level tree) was signalled.
    TreeSignalled,
    /// Group signalling failed; only the main process was signalled.
    ProcessSignalled,
    /// Nothing could be signalled (typically: already gone).
    Failed(String),
}

/// Send SIGTERM to the process group led by `pid`, falling back to the
/// process itself when the group cannot be signalled.
#[cfg(unix)]
pub fn terminate_process_tree(pid: u32) -> TerminateOutcome {
    use nix::sys::signal::{kill, killpg, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return TerminateOutcome::Failed(format!("pid {pid} out of range"));
    };
    let target = Pid::from_raw(raw);

    match killpg(target, Signal::SIGTERM) {
        Ok(()) => {
            debug!(pid, "sent SIGTERM to process group");
            TerminateOutcome::TreeSignalled
        }
        Err(group_err) => match kill(target, Signal::SIGTERM) {
            Ok(()) => {
                debug!(pid, error = %group_err, "group signal failed; sent SIGTERM to process");
                TerminateOutcome::ProcessSignalled
            }
            Err(err) => {
                warn!(pid, error = %err, "could not signal run process; it may already be gone");
                TerminateOutcome::Failed(err.to_string())
            }
        },
    }
}

/// Windows has no process groups to signal; `taskkill /T` walks the tree
/// of descendants instead.
#[cfg(not(unix))]
pub fn terminate_process_tree(pid: u32) -> TerminateOutcome {
    use std::process::{Command, Stdio};

    let spawned = Command::new("taskkill")
        .args(["/T", "/F", "/PID", &pid.to_string()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();

    match spawned {
        Ok(_) => {
            debug!(pid, "requested process tree termination");
            TerminateOutcome::TreeSignalled
        }
        Err(err) => {
            warn!(pid, error = %err, "could not launch taskkill");
            TerminateOutcome::Failed(err.to_string())
        }
    }
}
