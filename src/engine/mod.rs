// src/engine/mod.rs

//! Supervision engine.
//!
//! All run state for one run kind lives in a single control loop task:
//! - [`registry`] is the keyed store of runs with generation-based identity.
//! - [`run`] is one supervised execution: metadata, decoder and output buffer.
//! - [`core`] is the synchronous state machine applying starts, stops, output
//!   chunks, exits and reaper ticks to the registry.
//! - [`runtime`] is the async shell: it receives [`SupervisorEvent`]s, drives
//!   the core, spawns and signals processes, and schedules reaper timers.
//!
//! Because every mutation and every read is serialized through that one
//! loop, no lock guards the registry or the output buffers.

use tokio::sync::oneshot;

use crate::launch::LaunchRequest;
use crate::output::OutputSlice;
use crate::errors::StartError;
use crate::types::{Generation, RunKey, StreamKind};

pub mod core;
pub mod registry;
pub mod run;
pub mod runtime;

pub use self::core::{CoreOptions, StopTarget, SupervisorCore};
pub use self::registry::RunRegistry;
pub use self::run::{Run, RunSnapshot};
pub use self::runtime::ControlLoop;

/// How a supervised process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    /// Exit code, if the process exited normally.
    pub code: Option<i32>,
    /// Terminating signal, if it was killed by one (unix only).
    pub signal: Option<i32>,
}

impl ProcessExit {
    pub fn code(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    pub fn signalled(signal: i32) -> Self {
        Self {
            code: None,
            signal: Some(signal),
        }
    }

    pub fn from_status(status: std::process::ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }
}

/// Something that happened to a spawned process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    /// A raw chunk read from one of the pipes.
    Output { stream: StreamKind, chunk: Vec<u8> },
    /// The process exited and both pipes are closed.
    Exited(ProcessExit),
    /// The process could not be waited on.
    Failed(String),
}

/// Marks a terminal run for removal once the finished-run TTL has passed.
///
/// Carries the generation observed at scheduling time; the reap is a no-op
/// if the key has since been taken by a newer run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReapTicket {
    pub key: RunKey,
    pub generation: Generation,
}

/// Everything the control loop reacts to.
#[derive(Debug)]
pub enum SupervisorEvent {
    Start {
        key: RunKey,
        request: LaunchRequest,
        reply: oneshot::Sender<Result<(), StartError>>,
    },
    Stop {
        key: RunKey,
        reply: oneshot::Sender<bool>,
    },
    Clear {
        key: RunKey,
        reply: oneshot::Sender<bool>,
    },
    Status {
        key: RunKey,
        reply: oneshot::Sender<RunSnapshot>,
    },
    Output {
        key: RunKey,
        since: u64,
        reply: oneshot::Sender<OutputSlice>,
    },
    Process {
        key: RunKey,
        generation: Generation,
        event: ProcessEvent,
    },
    Reap(ReapTicket),
    /// Stop the control loop. Running processes are left alone.
    Shutdown,
}
