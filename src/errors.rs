// src/errors.rs

//! Crate-wide error types.
//!
//! Pre-spawn failures are reported synchronously through [`StartError`].
//! Anything that goes wrong after a process was launched is recorded on the
//! run itself and only observable by polling its status.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunboardError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Invalid or missing skill invocation input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SkillError {
    #[error("unknown skill '{0}' (expected one of: prd-questions, prd, ralph)")]
    UnknownSkill(String),

    #[error("{0}")]
    MissingParameter(String),

    #[error("skill instructions not found: {0}")]
    InstructionsNotFound(String),

    #[error("reading skill instructions {path}: {message}")]
    InstructionsUnreadable { path: String, message: String },
}

/// Why a start request was rejected before any process was launched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StartError {
    /// A non-terminal run already occupies the key.
    #[error("a run is already in progress for this key")]
    Busy,

    #[error("invalid invocation: {0}")]
    Validation(#[from] SkillError),

    /// The launch could not be prepared (missing script, chmod failure, ...).
    #[error("cannot launch: {0}")]
    Spawn(String),

    /// The supervisor control loop is no longer running.
    #[error("supervisor is shut down")]
    Unavailable,
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RunboardError>;
