// src/engine/runtime.rs

use std::fmt;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::StartError;
use crate::exec::{ProcessBackend, ProcessSink};
use crate::launch::LaunchRequest;
use crate::types::{RunKey, RunKind};

use super::core::SupervisorCore;
use super::{ProcessEvent, ReapTicket, SupervisorEvent};

/// Async shell around [`SupervisorCore`].
///
/// Owns the core and the process backend, receives every
/// [`SupervisorEvent`] for one run kind, and performs the side effects:
/// spawning, signalling, and reaper timers. Event handling never awaits, so
/// one slow request cannot hold up output from running processes.
pub struct ControlLoop<B: ProcessBackend> {
    kind: RunKind,
    core: SupervisorCore,
    backend: B,
    event_rx: mpsc::Receiver<SupervisorEvent>,
    /// Weak so that the loop ends once every handle and every process sink
    /// is gone.
    event_tx: mpsc::WeakSender<SupervisorEvent>,
    finished_ttl: Duration,
}

impl<B: ProcessBackend> fmt::Debug for ControlLoop<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlLoop")
            .field("kind", &self.kind)
            .field("core", &self.core)
            .field("finished_ttl", &self.finished_ttl)
            .finish_non_exhaustive()
    }
}

impl<B: ProcessBackend> ControlLoop<B> {
    pub fn new(
        kind: RunKind,
        core: SupervisorCore,
        backend: B,
        event_rx: mpsc::Receiver<SupervisorEvent>,
        event_tx: mpsc::WeakSender<SupervisorEvent>,
        finished_ttl: Duration,
    ) -> Self {
        Self {
            kind,
            core,
            backend,
            event_rx,
            event_tx,
            finished_ttl,
        }
    }

    /// Main event loop.
    pub async fn run(mut self) {
        info!(kind = %self.kind, "supervisor control loop started");

        while let Some(event) = self.event_rx.recv().await {
            if !self.handle_event(event) {
                info!(kind = %self.kind, "shutdown requested; stopping control loop");
                break;
            }
        }

        info!(kind = %self.kind, runs = self.core.registry().len(), "supervisor control loop exiting");
    }

    /// Apply one event. Returns `false` when the loop should stop.
    fn handle_event(&mut self, event: SupervisorEvent) -> bool {
        match event {
            SupervisorEvent::Start {
                key,
                request,
                reply,
            } => {
                let result = self.handle_start(key, request);
                let _ = reply.send(result);
            }
            SupervisorEvent::Stop { key, reply } => {
                let stopped = self.handle_stop(&key);
                let _ = reply.send(stopped);
            }
            SupervisorEvent::Clear { key, reply } => {
                let _ = reply.send(self.core.clear(&key));
            }
            SupervisorEvent::Status { key, reply } => {
                let _ = reply.send(self.core.status(&key));
            }
            SupervisorEvent::Output { key, since, reply } => {
                let _ = reply.send(self.core.output(&key, since));
            }
            SupervisorEvent::Process {
                key,
                generation,
                event,
            } => {
                let ticket = match event {
                    ProcessEvent::Output { stream, chunk } => {
                        self.core.record_output(&key, generation, stream, &chunk);
                        None
                    }
                    ProcessEvent::Exited(exit) => self.core.record_exit(&key, generation, exit),
                    ProcessEvent::Failed(message) => {
                        self.core.record_spawn_failed(&key, generation, message)
                    }
                };
                if let Some(ticket) = ticket {
                    self.schedule_reap(ticket);
                }
            }
            SupervisorEvent::Reap(ticket) => {
                self.core.reap(&ticket);
            }
            SupervisorEvent::Shutdown => return false,
        }
        true
    }

    fn handle_start(&mut self, key: RunKey, request: LaunchRequest) -> Result<(), StartError> {
        let tx = self.event_tx.upgrade().ok_or(StartError::Unavailable)?;
        let generation = self.core.begin_run(&key, request.skill, Utc::now())?;
        let sink = ProcessSink::new(key.clone(), generation, tx);

        match self.backend.spawn(request.spec, sink) {
            Ok(pid) => self.core.record_spawned(&key, generation, pid),
            Err(e) => {
                // Spawn errors surface through status, not through start.
                let message = format!("failed to spawn process: {e}");
                if let Some(ticket) = self.core.record_spawn_failed(&key, generation, message) {
                    self.schedule_reap(ticket);
                }
            }
        }

        Ok(())
    }

    fn handle_stop(&mut self, key: &str) -> bool {
        let Some(target) = self.core.stop_target(key) else {
            debug!(kind = %self.kind, key, "stop ignored; no running entry");
            return false;
        };

        match target.pid {
            Some(pid) => {
                let outcome = self.backend.terminate_tree(pid);
                debug!(kind = %self.kind, key, pid, ?outcome, "terminate requested");
            }
            None => warn!(kind = %self.kind, key, "running entry has no pid; nothing to signal"),
        }

        if let Some(ticket) = self.core.record_stopped(key, target.generation) {
            self.schedule_reap(ticket);
        }
        true
    }

    fn schedule_reap(&self, ticket: ReapTicket) {
        let tx = self.event_tx.clone();
        let ttl = self.finished_ttl;
        debug!(
            kind = %self.kind,
            key = %ticket.key,
            generation = ticket.generation,
            ttl_ms = ttl.as_millis() as u64,
            "scheduling eviction of finished run"
        );

        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(SupervisorEvent::Reap(ticket)).await;
            }
        });
    }
}
