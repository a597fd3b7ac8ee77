// src/skill/invocation.rs

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::errors::SkillError;
use crate::skill::Skill;

/// Caller-supplied inputs for a skill. Which field is required depends on
/// the skill; empty strings count as missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkillParams {
    pub feature_description: Option<String>,
    pub questions_file: Option<String>,
    pub prd_file: Option<String>,
}

impl SkillParams {
    pub fn feature(description: impl Into<String>) -> Self {
        Self {
            feature_description: Some(description.into()),
            ..Self::default()
        }
    }

    pub fn questions(path: impl Into<String>) -> Self {
        Self {
            questions_file: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn prd(path: impl Into<String>) -> Self {
        Self {
            prd_file: Some(path.into()),
            ..Self::default()
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// A validated skill call: the instruction handed to the agent and the
/// system prompt appended from the skill's instruction file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillInvocation {
    pub skill: Skill,
    pub prompt: String,
    pub system_prompt: String,
}

impl SkillInvocation {
    /// Validate `params` for `skill`, then load the instruction file.
    ///
    /// Nothing is spawned here; every failure is a [`SkillError`].
    pub fn build(
        skill: Skill,
        params: &SkillParams,
        instructions_path: &Path,
    ) -> Result<Self, SkillError> {
        let prompt = prompt_for(skill, params)?;
        let system_prompt = read_instructions(instructions_path)?;

        debug!(
            %skill,
            instructions = %instructions_path.display(),
            "skill invocation prepared"
        );

        Ok(Self {
            skill,
            prompt,
            system_prompt,
        })
    }

    /// Argument vector for the agent CLI.
    pub fn agent_args(&self) -> Vec<String> {
        vec![
            "-p".to_string(),
            self.prompt.clone(),
            "--append-system-prompt".to_string(),
            self.system_prompt.clone(),
            "--dangerously-skip-permissions".to_string(),
            "--output-format".to_string(),
            "stream-json".to_string(),
            "--verbose".to_string(),
        ]
    }
}

/// Build the instruction string for `skill`, enforcing its parameter contract.
pub fn prompt_for(skill: Skill, params: &SkillParams) -> Result<String, SkillError> {
    match skill {
        Skill::PrdQuestions => {
            if let Some(questions) = present(&params.questions_file) {
                return Ok(format!(
                    "Review the answered questions file at {questions} and generate follow-up \
                     questions based on the answers provided. Append them as a new \
                     \"## Follow-up Questions\" section."
                ));
            }
            let feature = present(&params.feature_description).ok_or_else(|| {
                SkillError::MissingParameter(
                    "featureDescription or questionsFile is required for prd-questions"
                        .to_string(),
                )
            })?;
            Ok(format!(
                "Generate clarifying questions for this feature: {feature}"
            ))
        }
        Skill::Prd => {
            let questions = present(&params.questions_file).ok_or_else(|| {
                SkillError::MissingParameter("questionsFile is required for prd".to_string())
            })?;
            Ok(format!(
                "Generate a PRD from the answered questions file at {questions}"
            ))
        }
        Skill::Ralph => {
            let prd = present(&params.prd_file).ok_or_else(|| {
                SkillError::MissingParameter("prdFile is required for ralph".to_string())
            })?;
            Ok(format!("Convert the PRD at {prd} to prd.json format"))
        }
    }
}

fn read_instructions(path: &Path) -> Result<String, SkillError> {
    if !path.is_file() {
        return Err(SkillError::InstructionsNotFound(path.display().to_string()));
    }
    fs::read_to_string(path).map_err(|e| SkillError::InstructionsUnreadable {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}
