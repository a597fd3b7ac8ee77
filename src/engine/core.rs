// src/engine/core.rs

//! Pure supervisor state machine.
//!
//! [`SupervisorCore`] owns the [`RunRegistry`] and applies every state
//! change: admitting a start, recording spawn results, output and exits,
//! user stops, reaper ticks and clears. It has no channels, no Tokio types,
//! and does not perform any IO; the async shell
//! ([`crate::engine::runtime::ControlLoop`]) performs the side effects the
//! core asks for (signalling a pid, scheduling a [`ReapTicket`]).
//!
//! State machine per run:
//! `Running -> Completed (exit 0)` or
//! `Running -> Failed (exit != 0, spawn/wait error, user stop)`.
//! Terminal runs never transition again; they only leave the registry.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::engine::registry::RunRegistry;
use crate::engine::run::{Run, RunSnapshot};
use crate::engine::{ProcessExit, ReapTicket};
use crate::errors::StartError;
use crate::output::{OutputSlice, DEFAULT_MAX_OUTPUT_LINES};
use crate::protocol::DecodeMode;
use crate::skill::Skill;
use crate::types::{Generation, StreamKind};

/// Per-kind settings applied to every run the core admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreOptions {
    pub max_output_lines: usize,
    pub mode: DecodeMode,
}

impl CoreOptions {
    pub fn new(mode: DecodeMode) -> Self {
        Self {
            max_output_lines: DEFAULT_MAX_OUTPUT_LINES,
            mode,
        }
    }
}

/// What the shell needs to signal for a stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopTarget {
    pub generation: Generation,
    pub pid: Option<u32>,
}

#[derive(Debug)]
pub struct SupervisorCore {
    registry: RunRegistry,
    options: CoreOptions,
}

impl SupervisorCore {
    pub fn new(options: CoreOptions) -> Self {
        Self {
            registry: RunRegistry::new(),
            options,
        }
    }

    pub fn options(&self) -> CoreOptions {
        self.options
    }

    /// Read-only access to the registry (for tests).
    pub fn registry(&self) -> &RunRegistry {
        &self.registry
    }

    /// Admit a new run for `key`.
    ///
    /// Rejected with [`StartError::Busy`] while a running entry holds the
    /// key. A terminal entry is discarded entirely; none of its output
    /// carries over.
    pub fn begin_run(
        &mut self,
        key: &str,
        skill: Option<Skill>,
        started_at: DateTime<Utc>,
    ) -> Result<Generation, StartError> {
        if let Some(existing) = self.registry.get(key) {
            if !existing.is_terminal() {
                debug!(
                    key,
                    generation = existing.generation(),
                    "start rejected; run already in progress"
                );
                return Err(StartError::Busy);
            }
        }

        let generation = self.registry.next_generation();
        let run = Run::new(
            key.to_string(),
            generation,
            skill,
            started_at,
            self.options.max_output_lines,
            self.options.mode,
        );

        if let Some(previous) = self.registry.insert(run) {
            debug!(
                key,
                replaced_generation = previous.generation(),
                generation,
                "replaced finished run"
            );
        }

        Ok(generation)
    }

    pub fn record_spawned(&mut self, key: &str, generation: Generation, pid: Option<u32>) {
        if let Some(run) = self.registry.get_current_mut(key, generation) {
            run.set_pid(pid);
            info!(key, generation, pid = ?pid, "run process spawned");
        }
    }

    /// The OS refused to create the process, or it could not be waited on.
    pub fn record_spawn_failed(
        &mut self,
        key: &str,
        generation: Generation,
        message: String,
    ) -> Option<ReapTicket> {
        let run = self.registry.get_current_mut(key, generation)?;
        warn!(key, generation, error = %message, "run process failed");
        run.fail(message).then(|| ticket(key, generation))
    }

    /// Decode and store a chunk of output. Chunks for a superseded
    /// generation are dropped. Returns the number of lines appended.
    pub fn record_output(
        &mut self,
        key: &str,
        generation: Generation,
        stream: StreamKind,
        chunk: &[u8],
    ) -> usize {
        match self.registry.get_current_mut(key, generation) {
            Some(run) => run.push_output(stream, chunk),
            None => {
                debug!(key, generation, "output for stale run dropped");
                0
            }
        }
    }

    /// The process exited and its pipes are closed.
    ///
    /// Returns a reap ticket if this made the run terminal. A run already
    /// marked terminal by a stop keeps its recorded outcome.
    pub fn record_exit(
        &mut self,
        key: &str,
        generation: Generation,
        exit: ProcessExit,
    ) -> Option<ReapTicket> {
        let run = self.registry.get_current_mut(key, generation)?;
        if !run.finish(exit) {
            return None;
        }
        info!(
            key,
            generation,
            state = %run.state(),
            exit_code = ?run.exit_code(),
            total_lines = run.output().total(),
            "run finished"
        );
        Some(ticket(key, generation))
    }

    /// The running entry for `key`, if a stop would apply to it.
    pub fn stop_target(&self, key: &str) -> Option<StopTarget> {
        self.registry
            .get(key)
            .filter(|run| !run.is_terminal())
            .map(|run| StopTarget {
                generation: run.generation(),
                pid: run.pid(),
            })
    }

    /// Mark the run as stopped by the user (`failed`, exit code -1).
    pub fn record_stopped(&mut self, key: &str, generation: Generation) -> Option<ReapTicket> {
        let run = self.registry.get_current_mut(key, generation)?;
        if !run.mark_stopped() {
            return None;
        }
        info!(key, generation, "run stopped by user");
        Some(ticket(key, generation))
    }

    /// Remove the run named by `ticket` if the key still holds it.
    pub fn reap(&mut self, ticket: &ReapTicket) -> bool {
        let removed = self
            .registry
            .remove_if_current(&ticket.key, ticket.generation);
        if removed {
            debug!(key = %ticket.key, generation = ticket.generation, "finished run evicted");
        }
        removed
    }

    /// Drop a finished run right away. Running or unknown keys are left alone.
    pub fn clear(&mut self, key: &str) -> bool {
        self.registry.remove_terminal(key)
    }

    pub fn status(&self, key: &str) -> RunSnapshot {
        self.registry
            .get(key)
            .map(Run::snapshot)
            .unwrap_or_else(RunSnapshot::absent)
    }

    pub fn output(&self, key: &str, since: u64) -> OutputSlice {
        match self.registry.get(key) {
            Some(run) => run.slice(since),
            None => OutputSlice::empty(since),
        }
    }
}

fn ticket(key: &str, generation: Generation) -> ReapTicket {
    ReapTicket {
        key: key.to_string(),
        generation,
    }
}
