// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Owner key a run is registered under (a project id).
pub type RunKey = String;

/// Identity of one registered run. Strictly increasing per registry, so a
/// later run for the same key never shares a generation with an earlier one.
pub type Generation = u64;

/// Lifecycle state of a run.
///
/// `Running` is the only non-terminal state. A run stopped by the user is
/// recorded as `Failed` with `stopped_by_user` set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Running,
    Completed,
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RunState::Running)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Running => "running",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// The two independent kinds of runs. Each kind has its own registry, so a
/// key may hold one active run of each kind at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunKind {
    /// Plain automation script; output is raw text.
    Script,
    /// Agent CLI skill invocation; stdout is the stream-JSON protocol.
    Skill,
}

impl fmt::Display for RunKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunKind::Script => f.write_str("script"),
            RunKind::Skill => f.write_str("skill"),
        }
    }
}

impl FromStr for RunKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "script" => Ok(RunKind::Script),
            "skill" => Ok(RunKind::Skill),
            other => Err(format!(
                "invalid run kind: {other} (expected \"script\" or \"skill\")"
            )),
        }
    }
}

/// Which pipe of the child a chunk of output came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}
