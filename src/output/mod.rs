// src/output/mod.rs

//! Bounded, incrementally pollable run output.
//!
//! - [`ring`] holds the fixed-capacity line store with absolute indexing.
//!
//! Pollers pass back the `total` of their previous read as the next `since`
//! cursor; lines that fell out of the retention window are skipped silently.

pub mod ring;

use serde::Serialize;

pub use ring::{RingLogBuffer, DEFAULT_MAX_OUTPUT_LINES};

/// Result of an offset-based output read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputSlice {
    /// Retained lines with absolute index `>= since`, oldest first.
    pub lines: Vec<String>,
    /// Number of lines ever appended to the run (including evicted ones).
    pub total: u64,
}

impl OutputSlice {
    /// Read result for a key with no registered run. Echoing `since` back
    /// keeps the caller's cursor from moving backwards.
    pub fn empty(since: u64) -> Self {
        Self {
            lines: Vec::new(),
            total: since,
        }
    }
}
