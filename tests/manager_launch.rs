// tests/manager_launch.rs

mod common;
use crate::common::builders::{dummy_spec, ConfigFileBuilder};
use crate::common::fake_backend::FakeBackend;
use crate::common::init_tracing;

use std::error::Error;
use std::fs;
use std::path::Path;

use runboard::engine::ProcessExit;
use runboard::env::{RunEnvironment, NESTED_SESSION_VAR};
use runboard::errors::{SkillError, StartError};
use runboard::launch::prepare_script;
use runboard::manager::RunManager;
use runboard::skill::{Skill, SkillParams};
use runboard::types::{RunKind, RunState};

type TestResult = Result<(), Box<dyn Error>>;

struct Harness {
    manager: RunManager,
    scripts: FakeBackend,
    skills: FakeBackend,
}

fn harness(builder: ConfigFileBuilder) -> Harness {
    let scripts = FakeBackend::new();
    let skills = FakeBackend::new();
    let base_env = RunEnvironment::from_vars([("PATH", "/usr/bin"), (NESTED_SESSION_VAR, "1")]);
    let manager = RunManager::with_backends(builder.build(), base_env, scripts.clone(), skills.clone());
    Harness {
        manager,
        scripts,
        skills,
    }
}

fn write_script(project: &Path, rel: &str) {
    let path = project.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "#!/bin/bash\necho hi\n").unwrap();
}

fn write_skill(project: &Path, skill: Skill) {
    let path = skill.instructions_path(project, Path::new(".claude/skills"));
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, format!("instructions for {skill}")).unwrap();
}

#[tokio::test]
async fn script_launch_uses_interpreter_project_dir_and_settings() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    write_script(dir.path(), "scripts/ralph/ralph-cc.sh");
    let h = harness(ConfigFileBuilder::new().with_git_identity("Ralph", "ralph@example.com"));

    h.manager.start_script("p1", dir.path()).await?;

    let spawned = h.scripts.spawned();
    assert_eq!(spawned.len(), 1);
    let spec = &spawned[0].spec;
    assert_eq!(spec.program, "bash");
    assert_eq!(
        spec.args,
        vec![dir.path().join("scripts/ralph/ralph-cc.sh").display().to_string()]
    );
    assert_eq!(spec.cwd, dir.path());
    assert_eq!(spec.env.get("GIT_AUTHOR_NAME").map(String::as_str), Some("Ralph"));
    assert!(!spec.env.contains_key(NESTED_SESSION_VAR));
    assert!(h.skills.spawned().is_empty());
    Ok(())
}

#[tokio::test]
async fn missing_script_is_rejected_before_spawn() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let h = harness(ConfigFileBuilder::new());

    let result = h.manager.start_script("p1", dir.path()).await;

    match result {
        Err(StartError::Spawn(msg)) => assert!(msg.starts_with("Script not found")),
        other => panic!("expected Spawn error, got {other:?}"),
    }
    assert!(h.scripts.spawned().is_empty());
    assert!(h.manager.scripts().status("p1").await.is_absent());
}

#[cfg(unix)]
#[test]
fn prepare_script_makes_the_script_executable() {
    use std::os::unix::fs::PermissionsExt;

    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    write_script(dir.path(), "bin/loop.sh");
    let path = dir.path().join("bin/loop.sh");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

    let cfg = ConfigFileBuilder::new().with_script("bin/loop.sh", "bash").build();
    let prepared = prepare_script(dir.path(), &cfg.script).unwrap();

    assert_eq!(prepared, path);
    let mode = fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o755);
}

#[tokio::test]
async fn skill_launch_runs_agent_with_stream_json() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    write_skill(dir.path(), Skill::Prd);
    let h = harness(ConfigFileBuilder::new().with_agent_command("/opt/claude"));

    h.manager
        .start_skill("p1", dir.path(), Skill::Prd, &SkillParams::questions("tasks/q.md"))
        .await?;

    let spawned = h.skills.spawned();
    assert_eq!(spawned.len(), 1);
    let spec = &spawned[0].spec;
    assert_eq!(spec.program, "/opt/claude");
    assert_eq!(spec.cwd, dir.path());
    assert_eq!(spec.args[0], "-p");
    assert_eq!(
        spec.args[1],
        "Generate a PRD from the answered questions file at tasks/q.md"
    );
    assert_eq!(spec.args[3], "instructions for prd");
    assert!(spec.args.windows(2).any(|w| w == ["--output-format", "stream-json"]));

    let status = h.manager.skills().status("p1").await;
    assert!(status.running);
    assert_eq!(status.skill, Some(Skill::Prd));
    Ok(())
}

#[tokio::test]
async fn invalid_skill_parameters_spawn_nothing() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    write_skill(dir.path(), Skill::Ralph);
    let h = harness(ConfigFileBuilder::new());

    let result = h
        .manager
        .start_skill("p1", dir.path(), Skill::Ralph, &SkillParams::default())
        .await;
    assert_eq!(
        result,
        Err(StartError::Validation(SkillError::MissingParameter(
            "prdFile is required for ralph".to_string()
        )))
    );

    let result = h
        .manager
        .start_skill("p1", dir.path(), Skill::Prd, &SkillParams::questions("q.md"))
        .await;
    assert!(matches!(
        result,
        Err(StartError::Validation(SkillError::InstructionsNotFound(_)))
    ));

    assert!(h.skills.spawned().is_empty());
}

#[tokio::test]
async fn script_and_skill_runs_are_independent_per_key() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    write_script(dir.path(), "scripts/ralph/ralph-cc.sh");
    write_skill(dir.path(), Skill::PrdQuestions);
    let h = harness(ConfigFileBuilder::new());

    h.manager.start_script("p1", dir.path()).await?;
    h.manager
        .start_skill(
            "p1",
            dir.path(),
            Skill::PrdQuestions,
            &SkillParams::feature("dark mode"),
        )
        .await?;

    assert!(h.manager.supervisor(RunKind::Script).status("p1").await.running);
    assert!(h.manager.supervisor(RunKind::Skill).status("p1").await.running);

    let busy = h
        .manager
        .start_command("p1", dummy_spec("another"))
        .await;
    assert_eq!(busy, Err(StartError::Busy));

    assert!(h.manager.skills().stop("p1").await);
    assert!(h.manager.scripts().status("p1").await.running);
    Ok(())
}

#[tokio::test]
async fn skill_restart_after_finish_is_allowed() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    write_skill(dir.path(), Skill::Ralph);
    let h = harness(ConfigFileBuilder::new());
    let params = SkillParams::prd("tasks/prd.md");

    h.manager.start_skill("p1", dir.path(), Skill::Ralph, &params).await?;
    let sink = h.skills.sink_for("p1").ok_or("no sink")?;
    sink.exited(ProcessExit::code(1)).await;
    assert_eq!(
        h.manager.skills().status("p1").await.state,
        Some(RunState::Failed)
    );

    h.manager.start_skill("p1", dir.path(), Skill::Ralph, &params).await?;
    assert_eq!(h.skills.spawned().len(), 2);
    assert!(h.manager.skills().status("p1").await.running);
    Ok(())
}

#[tokio::test]
async fn shutdown_stops_both_loops() {
    init_tracing();
    let h = harness(ConfigFileBuilder::new());

    h.manager.shutdown().await;

    let result = h.manager.start_command("p1", dummy_spec("a")).await;
    assert_eq!(result, Err(StartError::Unavailable));
}
