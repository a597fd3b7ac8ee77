// src/env.rs

//! Assembly of the environment handed to supervised processes.
//!
//! The supervisor forwards the resulting map untouched; all interpretation
//! of auth tokens, git identity and model overrides happens here.

use std::collections::BTreeMap;
use std::ffi::OsString;

use tracing::{debug, warn};

use crate::config::SettingsSection;

/// Marker set by the agent CLI inside its own sessions. Left in place it
/// makes a child agent refuse to start as a nested session.
pub const NESTED_SESSION_VAR: &str = "CLAUDECODE";
pub const API_KEY_VAR: &str = "ANTHROPIC_API_KEY";
pub const OAUTH_TOKEN_VAR: &str = "CLAUDE_CODE_OAUTH_TOKEN";
pub const MODEL_VAR: &str = "ANTHROPIC_MODEL";
pub const DISABLE_AUTO_MEMORY_VAR: &str = "CLAUDE_CODE_DISABLE_AUTO_MEMORY";

const OAUTH_TOKEN_PREFIX: &str = "sk-ant-oat";
const API_KEY_PREFIX: &str = "sk-ant-api";

const GIT_IDENTITY_VARS: [(&str, GitField); 4] = [
    ("GIT_AUTHOR_NAME", GitField::Name),
    ("GIT_AUTHOR_EMAIL", GitField::Email),
    ("GIT_COMMITTER_NAME", GitField::Name),
    ("GIT_COMMITTER_EMAIL", GitField::Email),
];

#[derive(Debug, Clone, Copy)]
enum GitField {
    Name,
    Email,
}

/// Environment variables for one run, built from a base environment plus
/// configured settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunEnvironment {
    vars: BTreeMap<String, String>,
}

impl RunEnvironment {
    /// Start from this process's own environment.
    pub fn from_current() -> Self {
        Self::from_os_vars(std::env::vars_os())
    }

    /// Build from raw OS pairs, dropping any that are not valid UTF-8.
    pub fn from_os_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        let vars = vars
            .into_iter()
            .filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
                (Ok(key), Ok(value)) => Some((key, value)),
                (key, _) => {
                    let key = key.unwrap_or_else(|raw| raw.to_string_lossy().into_owned());
                    warn!(%key, "skipping environment variable that is not valid UTF-8");
                    None
                }
            })
            .collect();
        Self { vars }
    }

    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Apply `[settings]` on top of the base environment.
    ///
    /// Settings only fill gaps: a variable already set to a non-blank value
    /// is never overwritten.
    pub fn with_settings(mut self, settings: &SettingsSection) -> Self {
        self.vars.remove(NESTED_SESSION_VAR);
        self.inject_token(settings.claude_token.as_deref());
        self.inject_git_identity(
            settings.git_user_name.as_deref(),
            settings.git_user_email.as_deref(),
        );
        if let Some(model) = non_blank(settings.claude_model.as_deref()) {
            self.set_if_absent(MODEL_VAR, model);
        }
        if !settings.auto_memory_enabled {
            self.set_if_absent(DISABLE_AUTO_MEMORY_VAR, "1");
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    pub fn into_vars(self) -> BTreeMap<String, String> {
        self.vars
    }

    fn inject_token(&mut self, token: Option<&str>) {
        if self.has_value(API_KEY_VAR) || self.has_value(OAUTH_TOKEN_VAR) {
            return;
        }
        let Some(token) = non_blank(token) else {
            return;
        };

        if token.starts_with(OAUTH_TOKEN_PREFIX) {
            debug!(var = OAUTH_TOKEN_VAR, "injecting configured agent token");
            self.vars.insert(OAUTH_TOKEN_VAR.to_string(), token.to_string());
        } else if token.starts_with(API_KEY_PREFIX) {
            debug!(var = API_KEY_VAR, "injecting configured agent token");
            self.vars.insert(API_KEY_VAR.to_string(), token.to_string());
        } else {
            warn!("configured agent token has an unrecognized prefix; not injecting it");
        }
    }

    fn inject_git_identity(&mut self, name: Option<&str>, email: Option<&str>) {
        let (Some(name), Some(email)) = (non_blank(name), non_blank(email)) else {
            return;
        };
        for (var, field) in GIT_IDENTITY_VARS {
            let value = match field {
                GitField::Name => name,
                GitField::Email => email,
            };
            self.set_if_absent(var, value);
        }
    }

    /// Blank values count as unset.
    fn has_value(&self, key: &str) -> bool {
        non_blank(self.get(key)).is_some()
    }

    fn set_if_absent(&mut self, key: &str, value: &str) {
        if !self.has_value(key) {
            self.vars.insert(key.to_string(), value.to_string());
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
