// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::default_config_path;
use crate::skill::{Skill, SkillParams};

/// Command-line arguments for `runboard`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "runboard",
    version,
    about = "Supervise long-running commands and agent skills, polling their output.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML). Missing file means defaults.
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RUNBOARD_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// How often to poll the run for new output.
    #[arg(long, value_name = "MS", default_value_t = 500)]
    pub poll_interval_ms: u64,

    /// Resolve and print the launch, but don't spawn anything.
    #[arg(long)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run an arbitrary command as a plain run.
    Exec {
        /// Owner key for the run.
        #[arg(long, default_value = "default")]
        key: String,

        /// Working directory (defaults to the current directory).
        #[arg(long, value_name = "DIR")]
        cwd: Option<PathBuf>,

        /// Program followed by its arguments.
        #[arg(last = true, required = true, value_name = "COMMAND")]
        command: Vec<String>,
    },

    /// Run the configured automation script of a project.
    Script {
        #[arg(long, default_value = "default")]
        key: String,

        #[arg(long, value_name = "DIR")]
        project_dir: PathBuf,
    },

    /// Run an agent skill in a project.
    Skill(SkillArgs),
}

#[derive(Debug, Clone, Args)]
pub struct SkillArgs {
    #[arg(long, default_value = "default")]
    pub key: String,

    #[arg(long, value_name = "DIR")]
    pub project_dir: PathBuf,

    /// One of: prd-questions, prd, ralph.
    #[arg(long, value_parser = parse_skill)]
    pub skill: Skill,

    #[arg(long, value_name = "TEXT")]
    pub feature_description: Option<String>,

    #[arg(long, value_name = "PATH")]
    pub questions_file: Option<String>,

    #[arg(long, value_name = "PATH")]
    pub prd_file: Option<String>,
}

impl SkillArgs {
    pub fn params(&self) -> SkillParams {
        SkillParams {
            feature_description: self.feature_description.clone(),
            questions_file: self.questions_file.clone(),
            prd_file: self.prd_file.clone(),
        }
    }
}

fn parse_skill(s: &str) -> Result<Skill, String> {
    s.parse::<Skill>().map_err(|e| e.to_string())
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
