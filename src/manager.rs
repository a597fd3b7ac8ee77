// src/manager.rs

//! Composition of the two run kinds for the calling application.

use std::path::Path;

use tracing::info;

use crate::config::ConfigFile;
use crate::env::RunEnvironment;
use crate::errors::StartError;
use crate::exec::ProcessBackend;
use crate::launch::{prepare_script, LaunchRequest, LaunchSpec};
use crate::skill::{Skill, SkillInvocation, SkillParams};
use crate::supervisor::{Supervisor, SupervisorOptions};
use crate::types::{RunKey, RunKind};

/// One supervisor per run kind, sharing configuration and base environment.
///
/// The application owns a `RunManager` and hands clones of it (or of its
/// supervisors) to whatever serves requests. Exclusion is per kind: a key
/// may have a script run and a skill run active at the same time.
#[derive(Debug, Clone)]
pub struct RunManager {
    scripts: Supervisor,
    skills: Supervisor,
    config: ConfigFile,
    base_env: RunEnvironment,
}

impl RunManager {
    /// Build both supervisors with real process backends.
    pub fn new(config: ConfigFile, base_env: RunEnvironment) -> Self {
        let scripts = Supervisor::spawn(SupervisorOptions::for_kind(
            RunKind::Script,
            &config.supervisor,
        ));
        let skills = Supervisor::spawn(SupervisorOptions::for_kind(
            RunKind::Skill,
            &config.supervisor,
        ));
        Self::from_parts(scripts, skills, config, base_env)
    }

    /// Build both supervisors on top of custom backends.
    pub fn with_backends<S, K>(
        config: ConfigFile,
        base_env: RunEnvironment,
        script_backend: S,
        skill_backend: K,
    ) -> Self
    where
        S: ProcessBackend,
        K: ProcessBackend,
    {
        let scripts = Supervisor::with_backend(
            SupervisorOptions::for_kind(RunKind::Script, &config.supervisor),
            script_backend,
        );
        let skills = Supervisor::with_backend(
            SupervisorOptions::for_kind(RunKind::Skill, &config.supervisor),
            skill_backend,
        );
        Self::from_parts(scripts, skills, config, base_env)
    }

    pub fn from_parts(
        scripts: Supervisor,
        skills: Supervisor,
        config: ConfigFile,
        base_env: RunEnvironment,
    ) -> Self {
        Self {
            scripts,
            skills,
            config,
            base_env,
        }
    }

    pub fn scripts(&self) -> &Supervisor {
        &self.scripts
    }

    pub fn skills(&self) -> &Supervisor {
        &self.skills
    }

    pub fn supervisor(&self, kind: RunKind) -> &Supervisor {
        match kind {
            RunKind::Script => &self.scripts,
            RunKind::Skill => &self.skills,
        }
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Environment forwarded to every run: base env plus `[settings]`.
    pub fn run_environment(&self) -> RunEnvironment {
        self.base_env.clone().with_settings(&self.config.settings)
    }

    /// Resolve the launch of the configured automation script for a project.
    pub fn script_launch(&self, project_dir: &Path) -> Result<LaunchSpec, StartError> {
        let script = prepare_script(project_dir, &self.config.script)?;
        Ok(LaunchSpec::for_script(
            &self.config.script.interpreter,
            &script,
            project_dir,
            self.run_environment().into_vars(),
        ))
    }

    /// Resolve the agent launch for `skill`, validating its parameters and
    /// loading its instruction file.
    pub fn skill_launch(
        &self,
        project_dir: &Path,
        skill: Skill,
        params: &SkillParams,
    ) -> Result<LaunchSpec, StartError> {
        let instructions = skill.instructions_path(project_dir, &self.config.agent.skills_dir);
        let invocation = SkillInvocation::build(skill, params, &instructions)?;
        Ok(LaunchSpec::for_skill(
            &self.config.agent.command,
            &invocation,
            project_dir,
            self.run_environment().into_vars(),
        ))
    }

    /// Start the automation script for `key` in `project_dir`.
    pub async fn start_script(
        &self,
        key: impl Into<RunKey>,
        project_dir: &Path,
    ) -> Result<(), StartError> {
        let key = key.into();
        let spec = self.script_launch(project_dir)?;
        info!(key = %key, project = %project_dir.display(), "starting script run");
        self.scripts.start(key, LaunchRequest::plain(spec)).await
    }

    /// Start an arbitrary command as a plain (raw text) run.
    pub async fn start_command(
        &self,
        key: impl Into<RunKey>,
        spec: LaunchSpec,
    ) -> Result<(), StartError> {
        self.scripts.start(key, LaunchRequest::plain(spec)).await
    }

    /// Start `skill` for `key` in `project_dir`.
    ///
    /// A finished skill run for the key is cleared first. Parameter and
    /// instruction-file problems are rejected before anything is spawned.
    pub async fn start_skill(
        &self,
        key: impl Into<RunKey>,
        project_dir: &Path,
        skill: Skill,
        params: &SkillParams,
    ) -> Result<(), StartError> {
        let key = key.into();
        let spec = self.skill_launch(project_dir, skill, params)?;
        self.skills.clear(key.clone()).await;
        info!(key = %key, %skill, project = %project_dir.display(), "starting skill run");
        self.skills.start(key, LaunchRequest::skill(spec, skill)).await
    }

    /// Stop both control loops.
    pub async fn shutdown(&self) {
        self.scripts.shutdown().await;
        self.skills.shutdown().await;
    }
}
