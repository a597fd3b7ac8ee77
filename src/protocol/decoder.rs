// src/protocol/decoder.rs

//! Chunk-to-line reassembly and per-stream rendering.

use crate::protocol::event::StreamEvent;
use crate::types::StreamKind;

/// How a run's output streams are turned into display lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeMode {
    /// Both streams are raw text (plain automation scripts).
    PlainText,
    /// Stdout carries stream-JSON events; stderr is raw text.
    AgentStream,
}

/// Holds the unterminated tail of one stream between chunks.
///
/// Works on bytes so a chunk boundary inside a multi-byte character is
/// harmless: decoding only happens once the whole line has arrived.
#[derive(Debug, Default, Clone)]
struct LineCarry {
    pending: Vec<u8>,
}

impl LineCarry {
    /// Add a chunk and return every line it completed, without newlines.
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut scan_from = self.pending.len();
        self.pending.extend_from_slice(chunk);

        while let Some(rel) = self.pending[scan_from..].iter().position(|b| *b == b'\n') {
            let end = scan_from + rel;
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            lines.push(String::from_utf8_lossy(&line[..end]).into_owned());
            scan_from = 0;
        }

        lines
    }

    /// Take whatever is left once the stream has ended.
    fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}

/// Turns raw stdout/stderr chunks of one process into display lines.
///
/// The returned lines are never empty and never contain a newline.
#[derive(Debug, Clone)]
pub struct LineDecoder {
    mode: DecodeMode,
    stdout: LineCarry,
    stderr: LineCarry,
}

impl LineDecoder {
    pub fn new(mode: DecodeMode) -> Self {
        Self {
            mode,
            stdout: LineCarry::default(),
            stderr: LineCarry::default(),
        }
    }

    pub fn mode(&self) -> DecodeMode {
        self.mode
    }

    /// Feed one chunk from `stream`.
    pub fn feed(&mut self, stream: StreamKind, chunk: &[u8]) -> Vec<String> {
        let raw_lines = match stream {
            StreamKind::Stdout => self.stdout.push(chunk),
            StreamKind::Stderr => self.stderr.push(chunk),
        };

        raw_lines
            .iter()
            .flat_map(|line| self.render(stream, line))
            .collect()
    }

    /// Flush both partial-line buffers (stdout first). Called once the
    /// process has closed its pipes.
    pub fn finish(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(rest) = self.stdout.finish() {
            lines.extend(self.render(StreamKind::Stdout, &rest));
        }
        if let Some(rest) = self.stderr.finish() {
            lines.extend(self.render(StreamKind::Stderr, &rest));
        }
        lines
    }

    fn render(&self, stream: StreamKind, line: &str) -> Vec<String> {
        match (self.mode, stream) {
            (DecodeMode::AgentStream, StreamKind::Stdout) => {
                let line = line.trim();
                if line.is_empty() {
                    return Vec::new();
                }
                StreamEvent::parse(line).display_lines()
            }
            (DecodeMode::AgentStream, StreamKind::Stderr) => non_empty(line.trim()),
            (DecodeMode::PlainText, _) => non_empty(line.trim_end()),
        }
    }
}

fn non_empty(line: &str) -> Vec<String> {
    if line.trim().is_empty() {
        Vec::new()
    } else {
        vec![line.to_string()]
    }
}
