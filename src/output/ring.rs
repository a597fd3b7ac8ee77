// src/output/ring.rs

use std::collections::VecDeque;

use super::OutputSlice;

/// Default number of lines retained per run.
pub const DEFAULT_MAX_OUTPUT_LINES: usize = 500;

/// Append-only line store that keeps only the newest `capacity` lines.
///
/// Every appended line gets an absolute index (`0, 1, 2, ...`). The index of
/// the oldest retained line is always `total - len`.
#[derive(Debug, Clone)]
pub struct RingLogBuffer {
    lines: VecDeque<String>,
    total: u64,
    capacity: usize,
}

impl RingLogBuffer {
    /// Create an empty buffer. A zero capacity is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity.min(DEFAULT_MAX_OUTPUT_LINES)),
            total: 0,
            capacity,
        }
    }

    /// Append one line, evicting from the head when over capacity.
    ///
    /// Empty lines are rejected and return `false`.
    pub fn append(&mut self, line: impl Into<String>) -> bool {
        let line = line.into();
        if line.is_empty() {
            return false;
        }

        self.lines.push_back(line);
        self.total += 1;
        while self.lines.len() > self.capacity {
            self.lines.pop_front();
        }
        true
    }

    /// Absolute index of the oldest retained line.
    pub fn start_index(&self) -> u64 {
        self.total - self.lines.len() as u64
    }

    /// Lines with absolute index `>= since` that are still retained, plus the
    /// cumulative total.
    pub fn slice(&self, since: u64) -> OutputSlice {
        let offset = since.saturating_sub(self.start_index());
        let lines = usize::try_from(offset)
            .map(|offset| self.lines.iter().skip(offset).cloned().collect())
            .unwrap_or_default();

        OutputSlice {
            lines,
            total: self.total,
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for RingLogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_OUTPUT_LINES)
    }
}
