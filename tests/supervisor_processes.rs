// tests/supervisor_processes.rs

#![cfg(unix)]

mod common;
use crate::common::builders::sh;
use crate::common::{eventually, init_tracing};

use std::collections::BTreeMap;
use std::error::Error;
use std::path::Path;

use runboard::config::SupervisorSection;
use runboard::engine::RunSnapshot;
use runboard::launch::{LaunchRequest, LaunchSpec};
use runboard::skill::Skill;
use runboard::supervisor::{Supervisor, SupervisorOptions};
use runboard::types::{RunKind, RunState};

type TestResult = Result<(), Box<dyn Error>>;

fn spawn(kind: RunKind) -> Supervisor {
    Supervisor::spawn(SupervisorOptions::for_kind(kind, &SupervisorSection::default()))
}

async fn finished(supervisor: &Supervisor, key: &str) -> RunSnapshot {
    eventually(move || async move {
        let status = supervisor.status(key).await;
        (!status.running && !status.is_absent()).then_some(status)
    })
    .await
}

#[tokio::test]
async fn successful_command_completes_with_its_output() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let supervisor = spawn(RunKind::Script);

    supervisor
        .start("p1", sh("echo hello; echo world", dir.path()))
        .await?;

    let status = finished(&supervisor, "p1").await;
    assert_eq!(status.state, Some(RunState::Completed));
    assert_eq!(status.exit_code, Some(0));
    assert!(status.pid.is_some());

    let slice = supervisor.output("p1", 0).await;
    assert_eq!(slice.lines, vec!["hello", "world"]);
    assert_eq!(slice.total, 2);
    Ok(())
}

#[tokio::test]
async fn nonzero_exit_is_failed_with_that_code() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let supervisor = spawn(RunKind::Script);

    supervisor.start("p1", sh("exit 137", dir.path())).await?;

    let status = finished(&supervisor, "p1").await;
    assert_eq!(status.state, Some(RunState::Failed));
    assert_eq!(status.exit_code, Some(137));
    assert!(!status.stopped_by_user);
    Ok(())
}

#[tokio::test]
async fn stderr_is_captured_and_partial_line_flushed() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let supervisor = spawn(RunKind::Script);

    supervisor
        .start("p1", sh("echo to-stderr 1>&2; printf 'no newline'", dir.path()))
        .await?;
    finished(&supervisor, "p1").await;

    let mut lines = supervisor.output("p1", 0).await.lines;
    lines.sort();
    assert_eq!(lines, vec!["no newline", "to-stderr"]);
    Ok(())
}

/// True once `pid` no longer exists, or only lingers as a zombie.
fn process_gone(pid: i32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    match kill(Pid::from_raw(pid), None) {
        Err(Errno::ESRCH) => true,
        Ok(()) => std::fs::read_to_string(format!("/proc/{pid}/stat"))
            .map(|stat| stat.contains(") Z "))
            .unwrap_or(false),
        Err(_) => false,
    }
}

#[tokio::test]
async fn stop_terminates_the_process_group() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let supervisor = spawn(RunKind::Script);

    supervisor
        .start("p1", sh("echo started; sleep 30 & echo $!; wait", dir.path()))
        .await?;

    let handle = &supervisor;
    let lines = eventually(move || async move {
        let slice = handle.output("p1", 0).await;
        (slice.total >= 2).then_some(slice.lines)
    })
    .await;
    let grandchild: i32 = lines[1].trim().parse()?;
    assert!(!process_gone(grandchild), "background sleep should be running");

    assert!(supervisor.stop("p1").await);
    let status = supervisor.status("p1").await;
    assert_eq!(status.state, Some(RunState::Failed));
    assert_eq!(status.exit_code, Some(-1));
    assert!(status.stopped_by_user);

    // The signal goes to the whole group, so the backgrounded grandchild
    // dies along with the shell.
    eventually(move || async move { process_gone(grandchild).then_some(()) }).await;

    supervisor.start("p1", sh("echo again", dir.path())).await?;
    let status = finished(&supervisor, "p1").await;
    assert_eq!(status.state, Some(RunState::Completed));
    assert_eq!(supervisor.output("p1", 0).await.lines, vec!["again"]);
    Ok(())
}

#[tokio::test]
async fn missing_working_directory_is_a_failed_run() -> TestResult {
    init_tracing();
    let supervisor = spawn(RunKind::Script);

    let request = sh("echo never", Path::new("/definitely/not/a/dir"));
    supervisor.start("p1", request).await?;

    let status = supervisor.status("p1").await;
    assert!(!status.running);
    assert_eq!(status.state, Some(RunState::Failed));
    assert_eq!(status.exit_code, Some(-1));
    let error = status.error.ok_or("missing error")?;
    assert!(error.starts_with("failed to spawn process"), "got: {error}");
    Ok(())
}

#[tokio::test]
async fn missing_program_fails_the_run() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let supervisor = spawn(RunKind::Script);

    let spec = LaunchSpec::new("runboard-definitely-not-installed", dir.path());
    supervisor.start("p1", LaunchRequest::plain(spec)).await?;

    let status = supervisor.status("p1").await;
    assert_eq!(status.state, Some(RunState::Failed));
    assert_eq!(status.exit_code, Some(-1));
    assert!(status.error.is_some());
    Ok(())
}

#[tokio::test]
async fn environment_is_exactly_the_given_map() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let supervisor = spawn(RunKind::Script);

    let mut env = BTreeMap::new();
    env.insert("PATH".to_string(), std::env::var("PATH")?);
    env.insert("RUNBOARD_MARKER".to_string(), "present".to_string());
    let spec = LaunchSpec::new("sh", dir.path())
        .args(["-c", "echo \"marker=$RUNBOARD_MARKER home=$HOME\"; pwd"])
        .env(env);

    supervisor.start("p1", LaunchRequest::plain(spec)).await?;
    finished(&supervisor, "p1").await;

    let lines = supervisor.output("p1", 0).await.lines;
    assert_eq!(lines[0], "marker=present home=");
    let cwd = std::fs::canonicalize(dir.path())?;
    assert_eq!(std::fs::canonicalize(&lines[1])?, cwd);
    Ok(())
}

#[tokio::test]
async fn long_output_keeps_only_the_newest_lines() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let supervisor = spawn(RunKind::Script);

    supervisor
        .start(
            "p1",
            sh("i=1; while [ $i -le 700 ]; do echo \"line $i\"; i=$((i+1)); done", dir.path()),
        )
        .await?;
    finished(&supervisor, "p1").await;

    let slice = supervisor.output("p1", 0).await;
    assert_eq!(slice.total, 700);
    assert_eq!(slice.lines.len(), 500);
    assert_eq!(slice.lines[0], "line 201");
    assert_eq!(slice.lines[499], "line 700");

    let tail = supervisor.output("p1", 650).await;
    assert_eq!(tail.lines.len(), 50);
    assert_eq!(tail.lines[0], "line 651");
    Ok(())
}

#[tokio::test]
async fn skill_run_renders_agent_events() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let supervisor = spawn(RunKind::Skill);

    let script = r#"printf '%s\n' '{"type":"system","subtype":"init"}' '{"type":"assistant","message":{"content":[{"type":"text","text":"Hello"},{"type":"tool_use","name":"Write","input":{"file_path":"prd.json"}}]}}' '{"type":"result","subtype":"success"}'"#;
    let request = sh(script, dir.path());
    supervisor
        .start("p1", LaunchRequest::skill(request.spec, Skill::Prd))
        .await?;

    let status = finished(&supervisor, "p1").await;
    assert_eq!(status.state, Some(RunState::Completed));
    assert_eq!(status.skill, Some(Skill::Prd));

    let slice = supervisor.output("p1", 0).await;
    assert_eq!(
        slice.lines,
        vec![
            "⏳ Agent session started...",
            "Hello",
            "📝 Writing prd.json",
            "✅ Skill completed successfully",
        ]
    );
    Ok(())
}
