// src/supervisor.rs

//! Cloneable handle to one run kind's control loop.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::config::SupervisorSection;
use crate::engine::{
    ControlLoop, CoreOptions, RunSnapshot, SupervisorCore, SupervisorEvent,
};
use crate::errors::StartError;
use crate::exec::{ProcessBackend, RealProcessBackend};
use crate::launch::LaunchRequest;
use crate::output::OutputSlice;
use crate::protocol::DecodeMode;
use crate::types::{RunKey, RunKind};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Settings for one supervisor instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorOptions {
    pub kind: RunKind,
    pub max_output_lines: usize,
    pub finished_ttl: Duration,
    pub mode: DecodeMode,
}

impl SupervisorOptions {
    /// Options for `kind`, taking buffer size and TTL from `[supervisor]`.
    /// Skill runs decode the agent stream protocol; script runs are raw text.
    pub fn for_kind(kind: RunKind, section: &SupervisorSection) -> Self {
        let mode = match kind {
            RunKind::Script => DecodeMode::PlainText,
            RunKind::Skill => DecodeMode::AgentStream,
        };
        Self {
            kind,
            max_output_lines: section.max_output_lines,
            finished_ttl: section.finished_ttl,
            mode,
        }
    }

    pub fn with_finished_ttl(mut self, ttl: Duration) -> Self {
        self.finished_ttl = ttl;
        self
    }

    pub fn with_max_output_lines(mut self, lines: usize) -> Self {
        self.max_output_lines = lines;
        self
    }
}

/// Handle to a running supervisor.
///
/// Cheap to clone; every clone talks to the same control loop and therefore
/// the same registry. At most one running entry per key is allowed.
#[derive(Debug, Clone)]
pub struct Supervisor {
    kind: RunKind,
    tx: mpsc::Sender<SupervisorEvent>,
}

impl Supervisor {
    /// Spawn a control loop that launches real processes.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(options: SupervisorOptions) -> Self {
        Self::with_backend(options, RealProcessBackend::new())
    }

    /// Spawn a control loop using a custom process backend.
    pub fn with_backend<B: ProcessBackend>(options: SupervisorOptions, backend: B) -> Self {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let core = SupervisorCore::new(CoreOptions {
            max_output_lines: options.max_output_lines,
            mode: options.mode,
        });
        let control = ControlLoop::new(
            options.kind,
            core,
            backend,
            rx,
            tx.downgrade(),
            options.finished_ttl,
        );
        tokio::spawn(control.run());

        Self {
            kind: options.kind,
            tx,
        }
    }

    pub fn kind(&self) -> RunKind {
        self.kind
    }

    /// Start a run for `key`.
    ///
    /// `Ok` means the run was registered and a spawn was attempted; a spawn
    /// failure shows up later as a `failed` status with exit code -1.
    pub async fn start(&self, key: impl Into<RunKey>, request: LaunchRequest) -> Result<(), StartError> {
        let key = key.into();
        let (reply, rx) = oneshot::channel();
        self.send(SupervisorEvent::Start {
            key,
            request,
            reply,
        })
        .await
        .ok_or(StartError::Unavailable)?;
        rx.await.unwrap_or(Err(StartError::Unavailable))
    }

    /// Request termination of `key`'s running process tree.
    ///
    /// Returns `false` if there is no running entry. The entry is marked
    /// `failed` / exit code -1 / stopped-by-user immediately, without
    /// waiting for the process to die.
    pub async fn stop(&self, key: impl Into<RunKey>) -> bool {
        let (reply, rx) = oneshot::channel();
        let key = key.into();
        if self.send(SupervisorEvent::Stop { key, reply }).await.is_none() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// Forget a finished run right away instead of waiting for the TTL.
    pub async fn clear(&self, key: impl Into<RunKey>) -> bool {
        let (reply, rx) = oneshot::channel();
        let key = key.into();
        if self.send(SupervisorEvent::Clear { key, reply }).await.is_none() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    pub async fn status(&self, key: impl Into<RunKey>) -> RunSnapshot {
        let (reply, rx) = oneshot::channel();
        let key = key.into();
        if self.send(SupervisorEvent::Status { key, reply }).await.is_none() {
            return RunSnapshot::absent();
        }
        rx.await.unwrap_or_else(|_| RunSnapshot::absent())
    }

    /// Lines appended at or after absolute index `since`, plus the total.
    pub async fn output(&self, key: impl Into<RunKey>, since: u64) -> OutputSlice {
        let (reply, rx) = oneshot::channel();
        let key = key.into();
        if self
            .send(SupervisorEvent::Output { key, since, reply })
            .await
            .is_none()
        {
            return OutputSlice::empty(since);
        }
        rx.await.unwrap_or_else(|_| OutputSlice::empty(since))
    }

    /// Stop the control loop. Processes still running are not signalled.
    pub async fn shutdown(&self) {
        let _ = self.send(SupervisorEvent::Shutdown).await;
    }

    async fn send(&self, event: SupervisorEvent) -> Option<()> {
        match self.tx.send(event).await {
            Ok(()) => Some(()),
            Err(_) => {
                debug!(kind = %self.kind, "supervisor control loop is gone");
                None
            }
        }
    }
}
