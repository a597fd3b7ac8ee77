// crates/test-utils/src/builders.rs

#![allow(dead_code)]

use std::path::Path;

use runboard::config::{ConfigFile, RawConfigFile};
use runboard::env::RunEnvironment;
use runboard::launch::{LaunchRequest, LaunchSpec};

/// Plain launch of `sh -c <script>` in `cwd`, forwarding the test's own
/// environment so `sh` can be found on `PATH`.
pub fn sh(script: &str, cwd: &Path) -> LaunchRequest {
    LaunchRequest::plain(
        LaunchSpec::new("sh", cwd)
            .args(["-c", script])
            .env(RunEnvironment::from_current().into_vars()),
    )
}

/// Launch spec for a program that is never run (fake backend tests).
pub fn dummy_spec(program: &str) -> LaunchSpec {
    LaunchSpec::new(program, ".")
}

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_max_output_lines(mut self, lines: usize) -> Self {
        self.config.supervisor.max_output_lines = lines;
        self
    }

    pub fn with_finished_ttl(mut self, ttl: &str) -> Self {
        self.config.supervisor.finished_ttl = ttl.to_string();
        self
    }

    pub fn with_agent_command(mut self, command: &str) -> Self {
        self.config.agent.command = command.to_string();
        self
    }

    pub fn with_skills_dir(mut self, dir: &str) -> Self {
        self.config.agent.skills_dir = dir.into();
        self
    }

    pub fn with_script(mut self, path: &str, interpreter: &str) -> Self {
        self.config.script.path = path.into();
        self.config.script.interpreter = interpreter.to_string();
        self
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.config.settings.claude_token = Some(token.to_string());
        self
    }

    pub fn with_git_identity(mut self, name: &str, email: &str) -> Self {
        self.config.settings.git_user_name = Some(name.to_string());
        self.config.settings.git_user_email = Some(email.to_string());
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.config.settings.claude_model = Some(model.to_string());
        self
    }

    pub fn with_auto_memory(mut self, enabled: bool) -> Self {
        self.config.settings.auto_memory_enabled = enabled;
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
