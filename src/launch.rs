// src/launch.rs

//! What to launch for a run, resolved by the caller before `start`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::ScriptSection;
use crate::errors::StartError;
use crate::skill::{Skill, SkillInvocation};

/// Fully resolved process launch: program, arguments, working directory and
/// the complete environment (nothing is inherited implicitly).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: BTreeMap<String, String>,
}

impl LaunchSpec {
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            env: BTreeMap::new(),
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Launch of the agent CLI for a prepared skill invocation.
    pub fn for_skill(
        agent_command: &str,
        invocation: &SkillInvocation,
        project_dir: &Path,
        env: BTreeMap<String, String>,
    ) -> Self {
        Self::new(agent_command, project_dir)
            .args(invocation.agent_args())
            .env(env)
    }

    /// Launch of the automation script through its interpreter.
    pub fn for_script(
        interpreter: &str,
        script: &Path,
        project_dir: &Path,
        env: BTreeMap<String, String>,
    ) -> Self {
        Self::new(interpreter, project_dir)
            .args([script.display().to_string()])
            .env(env)
    }
}

/// A start request as handed to a supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub spec: LaunchSpec,
    /// Set for skill runs; reported back through status.
    pub skill: Option<Skill>,
}

impl LaunchRequest {
    pub fn plain(spec: LaunchSpec) -> Self {
        Self { spec, skill: None }
    }

    pub fn skill(spec: LaunchSpec, skill: Skill) -> Self {
        Self {
            spec,
            skill: Some(skill),
        }
    }
}

/// Resolve the automation script below `project_dir` and make sure it can be
/// executed.
///
/// Fails with [`StartError::Spawn`] when the script is missing, or when it is
/// not executable and cannot be made so.
pub fn prepare_script(project_dir: &Path, script: &ScriptSection) -> Result<PathBuf, StartError> {
    let path = project_dir.join(&script.path);
    if !path.is_file() {
        return Err(StartError::Spawn(format!(
            "Script not found: {}. Try syncing the project files first.",
            path.display()
        )));
    }

    ensure_executable(&path)?;
    debug!(script = %path.display(), "script prepared");
    Ok(path)
}

#[cfg(unix)]
fn ensure_executable(path: &Path) -> Result<(), StartError> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = std::fs::metadata(path)
        .map_err(|e| StartError::Spawn(format!("inspecting {}: {e}", path.display())))?;
    if metadata.permissions().mode() & 0o111 != 0 {
        return Ok(());
    }

    warn!(script = %path.display(), "script is not executable; setting mode 0755");
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).map_err(|e| {
        StartError::Spawn(format!(
            "Script is not executable and chmod failed: {} ({e})",
            path.display()
        ))
    })
}

#[cfg(not(unix))]
fn ensure_executable(_path: &Path) -> Result<(), StartError> {
    Ok(())
}
