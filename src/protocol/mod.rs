// src/protocol/mod.rs

//! Output decoding for supervised processes.
//!
//! - [`decoder`] reassembles lines across arbitrary chunk boundaries and
//!   picks the rendering rule per stream.
//! - [`event`] models the agent CLI's stream-JSON events as a closed union
//!   and renders them into display lines.

pub mod decoder;
pub mod event;

pub use decoder::{DecodeMode, LineDecoder};
pub use event::{ContentBlock, ResultKind, StreamEvent, ToolInput};
