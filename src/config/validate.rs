// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{ConfigFile, RawConfigFile, SupervisorSection};
use crate::errors::{Result, RunboardError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::RunboardError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let supervisor = validate_supervisor(&raw)?;
        validate_agent(&raw)?;
        validate_script(&raw)?;
        Ok(ConfigFile::new_unchecked(
            supervisor,
            raw.agent,
            raw.script,
            raw.settings,
        ))
    }
}

fn validate_supervisor(cfg: &RawConfigFile) -> Result<SupervisorSection> {
    if cfg.supervisor.max_output_lines == 0 {
        return Err(RunboardError::ConfigError(
            "[supervisor].max_output_lines must be >= 1 (got 0)".to_string(),
        ));
    }

    let finished_ttl = parse_duration(&cfg.supervisor.finished_ttl).map_err(|e| {
        RunboardError::ConfigError(format!("[supervisor].finished_ttl: {e}"))
    })?;

    Ok(SupervisorSection {
        max_output_lines: cfg.supervisor.max_output_lines,
        finished_ttl,
    })
}

fn validate_agent(cfg: &RawConfigFile) -> Result<()> {
    if cfg.agent.command.trim().is_empty() {
        return Err(RunboardError::ConfigError(
            "[agent].command must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_script(cfg: &RawConfigFile) -> Result<()> {
    if cfg.script.path.as_os_str().is_empty() {
        return Err(RunboardError::ConfigError(
            "[script].path must not be empty".to_string(),
        ));
    }
    if cfg.script.path.is_absolute() {
        return Err(RunboardError::ConfigError(format!(
            "[script].path must be relative to the project directory (got {:?})",
            cfg.script.path
        )));
    }
    if cfg.script.interpreter.trim().is_empty() {
        return Err(RunboardError::ConfigError(
            "[script].interpreter must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}
