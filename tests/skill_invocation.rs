// tests/skill_invocation.rs

mod common;
use crate::common::init_tracing;

use std::fs;
use std::path::{Path, PathBuf};

use runboard::errors::SkillError;
use runboard::skill::invocation::prompt_for;
use runboard::skill::{Skill, SkillInvocation, SkillParams};

fn write_instructions(project: &Path, skill: Skill, body: &str) -> PathBuf {
    let path = skill.instructions_path(project, Path::new(".claude/skills"));
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn skill_names_round_trip_through_from_str() {
    init_tracing();

    for skill in Skill::ALL {
        assert_eq!(skill.as_str().parse::<Skill>(), Ok(skill));
    }
    assert_eq!(
        "deploy".parse::<Skill>(),
        Err(SkillError::UnknownSkill("deploy".to_string()))
    );
}

#[test]
fn instructions_live_under_the_skills_dir() {
    let path = Skill::PrdQuestions.instructions_path(Path::new("/work/app"), Path::new(".claude/skills"));
    assert_eq!(path, PathBuf::from("/work/app/.claude/skills/prd-questions/SKILL.md"));
}

#[test]
fn prd_questions_prefers_questions_file_over_feature() {
    init_tracing();

    let both = SkillParams {
        feature_description: Some("dark mode".into()),
        questions_file: Some("tasks/questions.md".into()),
        prd_file: None,
    };
    let prompt = prompt_for(Skill::PrdQuestions, &both).unwrap();
    assert!(prompt.contains("tasks/questions.md"));
    assert!(prompt.contains("Follow-up Questions"));
    assert!(!prompt.contains("dark mode"));

    let feature_only = prompt_for(Skill::PrdQuestions, &SkillParams::feature("dark mode")).unwrap();
    assert_eq!(
        feature_only,
        "Generate clarifying questions for this feature: dark mode"
    );
}

#[test]
fn missing_parameters_are_rejected_per_skill() {
    init_tracing();

    let empty = SkillParams::default();
    assert_eq!(
        prompt_for(Skill::PrdQuestions, &empty),
        Err(SkillError::MissingParameter(
            "featureDescription or questionsFile is required for prd-questions".to_string()
        ))
    );
    assert_eq!(
        prompt_for(Skill::Prd, &SkillParams::feature("ignored")),
        Err(SkillError::MissingParameter(
            "questionsFile is required for prd".to_string()
        ))
    );
    assert_eq!(
        prompt_for(Skill::Ralph, &SkillParams::prd("   ")),
        Err(SkillError::MissingParameter(
            "prdFile is required for ralph".to_string()
        )),
        "blank values count as missing"
    );
}

#[test]
fn prompts_name_their_input_file() {
    init_tracing();

    assert_eq!(
        prompt_for(Skill::Prd, &SkillParams::questions("tasks/q.md")).unwrap(),
        "Generate a PRD from the answered questions file at tasks/q.md"
    );
    assert_eq!(
        prompt_for(Skill::Ralph, &SkillParams::prd("tasks/prd.md")).unwrap(),
        "Convert the PRD at tasks/prd.md to prd.json format"
    );
}

#[test]
fn build_loads_instructions_and_forms_agent_args() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = write_instructions(dir.path(), Skill::Ralph, "# Ralph\nDo the thing.\n");

    let invocation = SkillInvocation::build(Skill::Ralph, &SkillParams::prd("prd.md"), &path).unwrap();
    assert_eq!(invocation.system_prompt, "# Ralph\nDo the thing.\n");

    assert_eq!(
        invocation.agent_args(),
        vec![
            "-p",
            "Convert the PRD at prd.md to prd.json format",
            "--append-system-prompt",
            "# Ralph\nDo the thing.\n",
            "--dangerously-skip-permissions",
            "--output-format",
            "stream-json",
            "--verbose",
        ]
    );
}

#[test]
fn parameters_are_checked_before_the_instruction_file() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let missing = Skill::Prd.instructions_path(dir.path(), Path::new(".claude/skills"));

    let err = SkillInvocation::build(Skill::Prd, &SkillParams::default(), &missing).unwrap_err();
    assert!(matches!(err, SkillError::MissingParameter(_)));

    let err = SkillInvocation::build(Skill::Prd, &SkillParams::questions("q.md"), &missing).unwrap_err();
    assert_eq!(
        err,
        SkillError::InstructionsNotFound(missing.display().to_string())
    );
}
