// src/skill/mod.rs

//! Agent skills: the fixed catalogue and how each one is invoked.

pub mod invocation;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::SkillError;

pub use invocation::{SkillInvocation, SkillParams};

/// One of the three automation modes run through the agent CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Skill {
    /// Generate clarifying questions for a feature (or follow-ups).
    PrdQuestions,
    /// Write a PRD from an answered questions file.
    Prd,
    /// Convert a PRD into `prd.json`.
    Ralph,
}

impl Skill {
    pub const ALL: [Skill; 3] = [Skill::PrdQuestions, Skill::Prd, Skill::Ralph];

    pub fn as_str(self) -> &'static str {
        match self {
            Skill::PrdQuestions => "prd-questions",
            Skill::Prd => "prd",
            Skill::Ralph => "ralph",
        }
    }

    /// Location of this skill's instruction file below a project directory:
    /// `<project>/<skills_dir>/<skill>/SKILL.md`.
    pub fn instructions_path(self, project_dir: &Path, skills_dir: &Path) -> PathBuf {
        project_dir
            .join(skills_dir)
            .join(self.as_str())
            .join("SKILL.md")
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Skill {
    type Err = SkillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Skill::ALL
            .into_iter()
            .find(|skill| skill.as_str() == s.trim())
            .ok_or_else(|| SkillError::UnknownSkill(s.to_string()))
    }
}
