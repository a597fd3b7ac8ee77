// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running run processes, using
//! `tokio::process::Command`, and reporting back to the supervisor's control
//! loop through a [`ProcessSink`].
//!
//! - [`backend`] provides the `ProcessBackend` trait and the concrete
//!   `RealProcessBackend` used in production, which tests can replace with a
//!   fake implementation.
//! - [`pump`] forwards one child's output chunks and exit status.
//! - [`terminate`] signals a run's whole process tree.

pub mod backend;
pub mod pump;
pub mod terminate;

pub use backend::{ProcessBackend, ProcessSink, RealProcessBackend};
pub use terminate::{terminate_process_tree, TerminateOutcome};
