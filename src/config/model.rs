// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::output::DEFAULT_MAX_OUTPUT_LINES;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [supervisor]
/// max_output_lines = 500
/// finished_ttl = "60s"
///
/// [agent]
/// command = "claude"
///
/// [script]
/// path = "scripts/ralph/ralph-cc.sh"
///
/// [settings]
/// git_user_name = "Ralph"
/// git_user_email = "ralph@example.com"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub supervisor: RawSupervisorSection,

    #[serde(default)]
    pub agent: AgentSection,

    #[serde(default)]
    pub script: ScriptSection,

    #[serde(default)]
    pub settings: SettingsSection,
}

/// Validated configuration. Built from [`RawConfigFile`] via `TryFrom`.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    pub supervisor: SupervisorSection,
    pub agent: AgentSection,
    pub script: ScriptSection,
    pub settings: SettingsSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        supervisor: SupervisorSection,
        agent: AgentSection,
        script: ScriptSection,
        settings: SettingsSection,
    ) -> Self {
        Self {
            supervisor,
            agent,
            script,
            settings,
        }
    }
}

/// `[supervisor]` section as written in TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSupervisorSection {
    /// Ring buffer capacity per run.
    #[serde(default = "default_max_output_lines")]
    pub max_output_lines: usize,

    /// How long a finished run stays readable, e.g. `"60s"`.
    #[serde(default = "default_finished_ttl")]
    pub finished_ttl: String,
}

fn default_max_output_lines() -> usize {
    DEFAULT_MAX_OUTPUT_LINES
}

fn default_finished_ttl() -> String {
    "60s".to_string()
}

impl Default for RawSupervisorSection {
    fn default() -> Self {
        Self {
            max_output_lines: default_max_output_lines(),
            finished_ttl: default_finished_ttl(),
        }
    }
}

/// Validated `[supervisor]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorSection {
    pub max_output_lines: usize,
    pub finished_ttl: Duration,
}

/// Default time a terminal run stays in its registry.
pub const DEFAULT_FINISHED_TTL: Duration = Duration::from_secs(60);

impl Default for SupervisorSection {
    fn default() -> Self {
        Self {
            max_output_lines: DEFAULT_MAX_OUTPUT_LINES,
            finished_ttl: DEFAULT_FINISHED_TTL,
        }
    }
}

/// `[agent]` section: the agent CLI used for skill runs.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AgentSection {
    #[serde(default = "default_agent_command")]
    pub command: String,

    /// Directory holding `<skill>/SKILL.md`, relative to the project.
    #[serde(default = "default_skills_dir")]
    pub skills_dir: PathBuf,
}

fn default_agent_command() -> String {
    "claude".to_string()
}

fn default_skills_dir() -> PathBuf {
    PathBuf::from(".claude/skills")
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            command: default_agent_command(),
            skills_dir: default_skills_dir(),
        }
    }
}

/// `[script]` section: the automation script run by plain runs.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ScriptSection {
    /// Script location, relative to the project.
    #[serde(default = "default_script_path")]
    pub path: PathBuf,

    #[serde(default = "default_interpreter")]
    pub interpreter: String,
}

fn default_script_path() -> PathBuf {
    PathBuf::from("scripts/ralph/ralph-cc.sh")
}

fn default_interpreter() -> String {
    "bash".to_string()
}

impl Default for ScriptSection {
    fn default() -> Self {
        Self {
            path: default_script_path(),
            interpreter: default_interpreter(),
        }
    }
}

/// `[settings]` section: values injected into the environment of runs.
///
/// Every field is a fallback; variables already present in the base
/// environment win.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SettingsSection {
    #[serde(default)]
    pub claude_token: Option<String>,

    #[serde(default)]
    pub git_user_name: Option<String>,

    #[serde(default)]
    pub git_user_email: Option<String>,

    #[serde(default)]
    pub claude_model: Option<String>,

    #[serde(default = "default_auto_memory_enabled")]
    pub auto_memory_enabled: bool,
}

fn default_auto_memory_enabled() -> bool {
    true
}

impl Default for SettingsSection {
    fn default() -> Self {
        Self {
            claude_token: None,
            git_user_name: None,
            git_user_email: None,
            claude_model: None,
            auto_memory_enabled: default_auto_memory_enabled(),
        }
    }
}
