// src/protocol/event.rs

//! Typed model of the agent CLI's line-delimited stream-JSON events.
//!
//! Only a handful of event shapes carry anything worth showing to a user.
//! Each line is decoded into the closed [`StreamEvent`] union; rendering is a
//! total match over it.

use serde::Deserialize;
use serde_json::Value;

/// Shown once when the agent reports its session init event.
pub const SESSION_STARTED: &str = "⏳ Agent session started...";
/// Shown for a `result` event with `subtype = "success"` and no result text.
pub const SUCCESS_MARKER: &str = "✅ Skill completed successfully";
/// Error text used when an error result carries no message.
pub const UNKNOWN_ERROR: &str = "unknown error";

/// Number of characters of a shell command kept in its summary line.
const COMMAND_PREVIEW_CHARS: usize = 80;

/// One decoded stdout line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// `{"type":"system","subtype":"init"}`.
    Init,
    /// An assistant turn with its content blocks in order.
    AssistantMessage { blocks: Vec<ContentBlock> },
    /// Final `result` event.
    Result(ResultKind),
    /// The line is not JSON at all; carries the trimmed text.
    Raw(String),
    /// Valid JSON without any displayable shape.
    Unparsed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    Text(String),
    ToolUse { name: String, input: ToolInput },
    Other,
}

/// The subset of tool input fields used for summaries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolInput {
    pub file_path: Option<String>,
    pub command: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultKind {
    /// Non-empty `result` text, shown verbatim.
    Text(String),
    Success,
    Error(Option<String>),
    /// Any other subtype without result text.
    Other,
}

impl StreamEvent {
    /// Decode a single complete line (without its newline).
    pub fn parse(line: &str) -> Self {
        let value: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(_) => return StreamEvent::Raw(line.trim().to_string()),
        };

        match WireEvent::deserialize(value) {
            Ok(wire) => wire.into(),
            Err(_) => StreamEvent::Unparsed,
        }
    }

    /// Human-readable lines for this event. May be empty.
    ///
    /// All contributions are joined and re-split on newlines, so multi-line
    /// assistant text becomes several display lines. Blank parts are dropped;
    /// the rest keep their whitespace.
    pub fn display_lines(&self) -> Vec<String> {
        let joined = match self {
            StreamEvent::Init => SESSION_STARTED.to_string(),
            StreamEvent::AssistantMessage { blocks } => blocks
                .iter()
                .filter_map(ContentBlock::summary)
                .collect::<Vec<_>>()
                .join("\n"),
            StreamEvent::Result(kind) => match kind {
                ResultKind::Text(text) => text.clone(),
                ResultKind::Success => SUCCESS_MARKER.to_string(),
                ResultKind::Error(message) => format!(
                    "❌ Error: {}",
                    message.as_deref().unwrap_or(UNKNOWN_ERROR)
                ),
                ResultKind::Other => String::new(),
            },
            StreamEvent::Raw(text) => text.clone(),
            StreamEvent::Unparsed => String::new(),
        };

        joined
            .split('\n')
            .filter(|part| !part.trim().is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl ContentBlock {
    fn summary(&self) -> Option<String> {
        match self {
            ContentBlock::Text(text) => {
                let text = text.trim();
                (!text.is_empty()).then(|| text.to_string())
            }
            ContentBlock::ToolUse { name, input } => Some(tool_summary(name, input)),
            ContentBlock::Other => None,
        }
    }
}

fn tool_summary(name: &str, input: &ToolInput) -> String {
    match (name, input.file_path.as_deref(), input.command.as_deref()) {
        ("Write", Some(path), _) => format!("📝 Writing {path}"),
        ("Read", Some(path), _) => format!("📖 Reading {path}"),
        ("Edit", Some(path), _) => format!("✏️  Editing {path}"),
        ("Bash", _, Some(command)) => {
            let preview: String = command.chars().take(COMMAND_PREVIEW_CHARS).collect();
            format!("💻 Running: {preview}")
        }
        _ => format!("🔧 Using {name}"),
    }
}

// Wire shapes. Fields the renderer does not need are ignored; unknown event
// and block types map to unit `Other` variants.

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireEvent {
    System {
        #[serde(default)]
        subtype: Option<String>,
    },
    Assistant {
        #[serde(default)]
        message: Option<WireMessage>,
    },
    Result {
        #[serde(default)]
        subtype: Option<String>,
        #[serde(default)]
        result: Option<String>,
        #[serde(default)]
        error: Option<String>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<Vec<WireBlock>>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireBlock {
    Text {
        #[serde(default)]
        text: Option<String>,
    },
    ToolUse {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        input: Option<WireToolInput>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Default, Deserialize)]
struct WireToolInput {
    #[serde(default)]
    file_path: Option<Value>,
    #[serde(default)]
    command: Option<Value>,
}

impl From<WireEvent> for StreamEvent {
    fn from(wire: WireEvent) -> Self {
        match wire {
            WireEvent::System { subtype } if subtype.as_deref() == Some("init") => {
                StreamEvent::Init
            }
            WireEvent::System { .. } => StreamEvent::Unparsed,
            WireEvent::Assistant { message: None } => StreamEvent::Unparsed,
            WireEvent::Assistant {
                message: Some(message),
            } => StreamEvent::AssistantMessage {
                blocks: message
                    .content
                    .unwrap_or_default()
                    .into_iter()
                    .map(ContentBlock::from)
                    .collect(),
            },
            WireEvent::Result {
                subtype,
                result,
                error,
            } => {
                let kind = match (result, subtype.as_deref()) {
                    (Some(text), _) if !text.is_empty() => ResultKind::Text(text),
                    (_, Some("success")) => ResultKind::Success,
                    (_, Some("error")) => ResultKind::Error(error.filter(|e| !e.is_empty())),
                    _ => ResultKind::Other,
                };
                StreamEvent::Result(kind)
            }
            WireEvent::Other => StreamEvent::Unparsed,
        }
    }
}

impl From<WireBlock> for ContentBlock {
    fn from(wire: WireBlock) -> Self {
        match wire {
            WireBlock::Text { text: Some(text) } => ContentBlock::Text(text),
            WireBlock::Text { text: None } => ContentBlock::Other,
            WireBlock::ToolUse { name, input } => {
                let input = input.unwrap_or_default();
                ContentBlock::ToolUse {
                    name: name.unwrap_or_else(|| "unknown tool".to_string()),
                    input: ToolInput {
                        file_path: input.file_path.as_ref().and_then(display_value),
                        command: input.command.as_ref().and_then(display_value),
                    },
                }
            }
            WireBlock::Other => ContentBlock::Other,
        }
    }
}

/// Render a loosely typed tool input field. Absent, null, false, zero and
/// empty values count as missing.
fn display_value(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}
