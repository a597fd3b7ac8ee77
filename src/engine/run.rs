// src/engine/run.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::engine::ProcessExit;
use crate::output::{OutputSlice, RingLogBuffer};
use crate::protocol::{DecodeMode, LineDecoder};
use crate::skill::Skill;
use crate::types::{Generation, RunKey, RunState, StreamKind};

/// Exit code recorded for runs that were stopped or never got a process.
pub const ABORTED_EXIT_CODE: i32 = -1;

/// One supervised execution for a key.
///
/// Mutated only by decoded output and by terminal transitions (exit, spawn
/// failure, user stop). Once terminal, the state fields never change again.
#[derive(Debug, Clone)]
pub struct Run {
    key: RunKey,
    generation: Generation,
    skill: Option<Skill>,
    pid: Option<u32>,
    started_at: DateTime<Utc>,
    state: RunState,
    exit_code: Option<i32>,
    error: Option<String>,
    stopped_by_user: bool,
    output: RingLogBuffer,
    decoder: LineDecoder,
}

impl Run {
    pub fn new(
        key: RunKey,
        generation: Generation,
        skill: Option<Skill>,
        started_at: DateTime<Utc>,
        max_output_lines: usize,
        mode: DecodeMode,
    ) -> Self {
        Self {
            key,
            generation,
            skill,
            pid: None,
            started_at,
            state: RunState::Running,
            exit_code: None,
            error: None,
            stopped_by_user: false,
            output: RingLogBuffer::new(max_output_lines),
            decoder: LineDecoder::new(mode),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn skill(&self) -> Option<Skill> {
        self.skill
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn stopped_by_user(&self) -> bool {
        self.stopped_by_user
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn output(&self) -> &RingLogBuffer {
        &self.output
    }

    pub(crate) fn set_pid(&mut self, pid: Option<u32>) {
        self.pid = pid;
    }

    /// Decode a chunk and append the resulting lines. Returns how many
    /// lines were appended.
    ///
    /// Output keeps flowing into terminal runs: a stopped process may still
    /// print while it dies.
    pub(crate) fn push_output(&mut self, stream: StreamKind, chunk: &[u8]) -> usize {
        let lines = self.decoder.feed(stream, chunk);
        self.append_lines(lines)
    }

    /// Flush partial lines, then record the exit unless the run is already
    /// terminal. Returns `true` if this call made the run terminal.
    pub(crate) fn finish(&mut self, exit: ProcessExit) -> bool {
        let flushed = self.decoder.finish();
        self.append_lines(flushed);

        if self.is_terminal() {
            debug!(
                key = %self.key,
                generation = self.generation,
                exit_code = ?exit.code,
                "process exited after run was already terminal; keeping recorded outcome"
            );
            return false;
        }

        match (exit.code, exit.signal) {
            (Some(0), _) => {
                self.state = RunState::Completed;
                self.exit_code = Some(0);
            }
            (Some(code), _) => {
                self.state = RunState::Failed;
                self.exit_code = Some(code);
            }
            (None, signal) => {
                self.state = RunState::Failed;
                self.exit_code = None;
                self.error = Some(match signal {
                    Some(sig) => format!("process terminated by signal {sig}"),
                    None => "process terminated without an exit code".to_string(),
                });
            }
        }
        true
    }

    /// Record a failure to launch or wait on the process. Returns `true` if
    /// this call made the run terminal.
    pub(crate) fn fail(&mut self, message: String) -> bool {
        let flushed = self.decoder.finish();
        self.append_lines(flushed);

        if self.is_terminal() {
            return false;
        }
        self.state = RunState::Failed;
        self.exit_code = Some(ABORTED_EXIT_CODE);
        self.error = Some(message);
        true
    }

    /// Record a user stop. Returns `false` if the run was already terminal.
    pub(crate) fn mark_stopped(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.state = RunState::Failed;
        self.exit_code = Some(ABORTED_EXIT_CODE);
        self.stopped_by_user = true;
        true
    }

    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            running: !self.is_terminal(),
            pid: self.pid,
            started_at: Some(self.started_at),
            exit_code: self.exit_code,
            error: self.error.clone(),
            state: Some(self.state),
            skill: self.skill,
            stopped_by_user: self.stopped_by_user,
            total_lines: self.output.total(),
        }
    }

    pub fn slice(&self, since: u64) -> OutputSlice {
        self.output.slice(since)
    }

    fn append_lines(&mut self, lines: Vec<String>) -> usize {
        let mut appended = 0;
        for line in lines {
            if self.output.append(line) {
                appended += 1;
            }
        }
        appended
    }
}

/// Point-in-time view of a key's run, shaped for the calling HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSnapshot {
    pub running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    pub exit_code: Option<i32>,
    pub error: Option<String>,
    /// `None` when no run is registered for the key.
    pub state: Option<RunState>,
    pub skill: Option<Skill>,
    pub stopped_by_user: bool,
    pub total_lines: u64,
}

impl RunSnapshot {
    /// Snapshot for a key with no registered run.
    pub fn absent() -> Self {
        Self {
            running: false,
            pid: None,
            started_at: None,
            exit_code: None,
            error: None,
            state: None,
            skill: None,
            stopped_by_user: false,
            total_lines: 0,
        }
    }

    pub fn is_absent(&self) -> bool {
        self.state.is_none()
    }
}
