// src/exec/backend.rs

//! Pluggable process backend.
//!
//! The control loop talks to a `ProcessBackend` instead of spawning and
//! signalling processes itself. Production uses [`RealProcessBackend`];
//! tests swap in a fake that records launches and lets the test push output
//! and exits through the [`ProcessSink`] it was handed.

use std::io;
use std::process::Stdio;

use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::engine::{ProcessEvent, ProcessExit, SupervisorEvent};
use crate::launch::LaunchSpec;
use crate::types::{Generation, RunKey, StreamKind};

use super::pump::pump_process;
use super::terminate::{terminate_process_tree, TerminateOutcome};

/// Trait abstracting how run processes are created and terminated.
pub trait ProcessBackend: Send + 'static {
    /// Launch `spec` detached in its own process group and start forwarding
    /// its output and exit to `sink`. Returns the pid when known.
    ///
    /// Must not block: the control loop calls this inline.
    fn spawn(&mut self, spec: LaunchSpec, sink: ProcessSink) -> io::Result<Option<u32>>;

    /// Ask the process tree rooted at `pid` to terminate. Does not wait for
    /// it to die.
    fn terminate_tree(&mut self, pid: u32) -> TerminateOutcome;
}

/// Where one run's process reports back to its control loop.
///
/// Events are tagged with the run's key and generation, so reports from a
/// process whose run has since been replaced are ignored by the core.
#[derive(Debug, Clone)]
pub struct ProcessSink {
    key: RunKey,
    generation: Generation,
    tx: mpsc::Sender<SupervisorEvent>,
}

impl ProcessSink {
    pub(crate) fn new(key: RunKey, generation: Generation, tx: mpsc::Sender<SupervisorEvent>) -> Self {
        Self {
            key,
            generation,
            tx,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Forward a raw chunk. Returns `false` once the control loop is gone.
    pub async fn output(&self, stream: StreamKind, chunk: Vec<u8>) -> bool {
        self.send(ProcessEvent::Output { stream, chunk }).await
    }

    pub async fn exited(&self, exit: ProcessExit) -> bool {
        self.send(ProcessEvent::Exited(exit)).await
    }

    pub async fn failed(&self, message: impl Into<String>) -> bool {
        self.send(ProcessEvent::Failed(message.into())).await
    }

    async fn send(&self, event: ProcessEvent) -> bool {
        self.tx
            .send(SupervisorEvent::Process {
                key: self.key.clone(),
                generation: self.generation,
                event,
            })
            .await
            .is_ok()
    }
}

/// Backend that runs real OS processes with `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct RealProcessBackend;

impl RealProcessBackend {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessBackend for RealProcessBackend {
    fn spawn(&mut self, spec: LaunchSpec, sink: ProcessSink) -> io::Result<Option<u32>> {
        info!(
            key = %sink.key(),
            generation = sink.generation(),
            program = %spec.program,
            args = spec.args.len(),
            cwd = %spec.cwd.display(),
            "spawning run process"
        );

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .current_dir(&spec.cwd)
            .env_clear()
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Own process group, so a stop can signal the whole tree and a
        // Ctrl-C aimed at the supervisor does not reach the run.
        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd.spawn()?;
        let pid = child.id();
        debug!(key = %sink.key(), pid = ?pid, "run process started");

        tokio::spawn(pump_process(child, sink));
        Ok(pid)
    }

    fn terminate_tree(&mut self, pid: u32) -> TerminateOutcome {
        terminate_process_tree(pid)
    }
}
