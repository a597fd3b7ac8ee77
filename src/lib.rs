// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod env;
pub mod errors;
pub mod exec;
pub mod launch;
pub mod logging;
pub mod manager;
pub mod output;
pub mod protocol;
pub mod skill;
pub mod supervisor;
pub mod types;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::cli::{CliArgs, Command};
use crate::config::load_or_default;
use crate::env::RunEnvironment;
use crate::launch::{LaunchRequest, LaunchSpec};
use crate::manager::RunManager;
use crate::supervisor::Supervisor;
use crate::types::RunState;

pub use crate::engine::RunSnapshot;
pub use crate::errors::{RunboardError, SkillError, StartError};
pub use crate::output::OutputSlice;
pub use crate::supervisor::SupervisorOptions;
pub use crate::types::{RunKey, RunKind};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the run manager (one supervisor per run kind)
/// - the launch for the chosen subcommand
/// - output polling until the run is terminal
/// - Ctrl-C handling (stops the run)
///
/// Returns the process exit code to use.
pub async fn run(args: CliArgs) -> Result<i32> {
    let cfg = load_or_default(&args.config)
        .with_context(|| format!("loading config from {:?}", args.config))?;

    let manager = RunManager::new(cfg, RunEnvironment::from_current());

    let (key, request) = match &args.command {
        Command::Exec { key, cwd, command } => {
            let cwd = match cwd {
                Some(dir) => dir.clone(),
                None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            };
            let (program, rest) = command
                .split_first()
                .context("exec requires a command to run")?;
            let spec = LaunchSpec::new(program.clone(), cwd)
                .args(rest.iter().cloned())
                .env(manager.run_environment().into_vars());
            (key.clone(), LaunchRequest::plain(spec))
        }
        Command::Script { key, project_dir } => {
            let spec = manager.script_launch(project_dir)?;
            (key.clone(), LaunchRequest::plain(spec))
        }
        Command::Skill(skill_args) => {
            let spec =
                manager.skill_launch(&skill_args.project_dir, skill_args.skill, &skill_args.params())?;
            (skill_args.key.clone(), LaunchRequest::skill(spec, skill_args.skill))
        }
    };
    let kind = if request.skill.is_some() {
        RunKind::Skill
    } else {
        RunKind::Script
    };

    if args.dry_run {
        print_dry_run(kind, &key, &request.spec);
        manager.shutdown().await;
        return Ok(0);
    }

    let supervisor = manager.supervisor(kind);
    if kind == RunKind::Skill {
        supervisor.clear(key.clone()).await;
    }
    supervisor.start(key.clone(), request).await?;

    let poll_interval = Duration::from_millis(args.poll_interval_ms.max(10));
    let snapshot = follow(supervisor, &key, poll_interval).await;
    manager.shutdown().await;

    info!(
        %key,
        state = ?snapshot.state,
        exit_code = ?snapshot.exit_code,
        stopped_by_user = snapshot.stopped_by_user,
        "run ended"
    );
    if let Some(err) = &snapshot.error {
        warn!(%key, error = %err, "run reported an error");
    }

    Ok(exit_code_for(&snapshot))
}

/// Poll `key` until its run is terminal, printing new lines to stdout.
/// Ctrl-C stops the run; polling continues until the final lines are read.
pub async fn follow(supervisor: &Supervisor, key: &str, poll_interval: Duration) -> RunSnapshot {
    let mut cursor = 0u64;
    let mut interrupted = false;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let slice = supervisor.output(key, cursor).await;
        for line in &slice.lines {
            println!("{line}");
        }
        cursor = slice.total;

        let status = supervisor.status(key).await;
        if !status.running {
            // Lines decoded on exit may have landed after our last read.
            let tail = supervisor.output(key, cursor).await;
            for line in &tail.lines {
                println!("{line}");
            }
            return status;
        }

        tokio::select! {
            _ = tokio::time::sleep(poll_interval) => {}
            res = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                if let Err(e) = res {
                    warn!(error = %e, "failed to listen for Ctrl+C");
                    continue;
                }
                info!(%key, "Ctrl+C received; stopping run");
                let stopped = supervisor.stop(key).await;
                debug!(%key, stopped, "stop requested");
            }
        }
    }
}

/// Exit code for the CLI: the run's own exit code when it has a meaningful
/// one, otherwise 0 for completed and 1 for failed.
pub fn exit_code_for(snapshot: &RunSnapshot) -> i32 {
    match (snapshot.state, snapshot.exit_code) {
        (Some(RunState::Completed), _) => 0,
        (_, Some(code)) if code > 0 => code,
        _ => 1,
    }
}

/// Print the resolved launch without running it. Environment values are
/// omitted since they may carry credentials.
fn print_dry_run(kind: RunKind, key: &str, spec: &LaunchSpec) {
    println!("runboard dry-run");
    println!("  kind: {kind}");
    println!("  key: {key}");
    println!("  program: {}", spec.program);
    for arg in &spec.args {
        let preview: String = arg.chars().take(120).collect();
        if preview.len() < arg.len() {
            println!("  arg: {preview}...");
        } else {
            println!("  arg: {preview}");
        }
    }
    println!("  cwd: {}", spec.cwd.display());
    println!("  env ({} vars):", spec.env.len());
    for name in spec.env.keys() {
        println!("    {name}");
    }

    debug!("dry-run complete (no execution)");
}
