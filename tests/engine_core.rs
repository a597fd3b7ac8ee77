// tests/engine_core.rs

mod common;
use crate::common::init_tracing;

use chrono::Utc;

use runboard::engine::{CoreOptions, ProcessExit, ReapTicket, StopTarget, SupervisorCore};
use runboard::errors::StartError;
use runboard::protocol::DecodeMode;
use runboard::skill::Skill;
use runboard::types::{RunState, StreamKind};

fn core() -> SupervisorCore {
    SupervisorCore::new(CoreOptions::new(DecodeMode::PlainText))
}

#[test]
fn second_start_while_running_is_busy() {
    init_tracing();
    let mut core = core();

    let generation = core.begin_run("p1", None, Utc::now()).unwrap();
    core.record_spawned("p1", generation, Some(42));

    assert_eq!(core.begin_run("p1", None, Utc::now()), Err(StartError::Busy));
    assert!(core.begin_run("p2", None, Utc::now()).is_ok(), "other keys are independent");

    let status = core.status("p1");
    assert!(status.running);
    assert_eq!(status.pid, Some(42));
    assert_eq!(status.state, Some(RunState::Running));
}

#[test]
fn exit_codes_map_to_terminal_states() {
    init_tracing();
    let mut core = core();

    let ok = core.begin_run("ok", None, Utc::now()).unwrap();
    assert!(core.record_exit("ok", ok, ProcessExit::code(0)).is_some());
    let status = core.status("ok");
    assert_eq!(status.state, Some(RunState::Completed));
    assert_eq!(status.exit_code, Some(0));
    assert!(!status.running);

    let bad = core.begin_run("bad", None, Utc::now()).unwrap();
    core.record_exit("bad", bad, ProcessExit::code(137));
    let status = core.status("bad");
    assert_eq!(status.state, Some(RunState::Failed));
    assert_eq!(status.exit_code, Some(137));
    assert!(!status.stopped_by_user);

    let killed = core.begin_run("killed", None, Utc::now()).unwrap();
    core.record_exit("killed", killed, ProcessExit::signalled(9));
    let status = core.status("killed");
    assert_eq!(status.state, Some(RunState::Failed));
    assert_eq!(status.exit_code, None);
    assert!(status.error.unwrap_or_default().contains("signal 9"));
}

#[test]
fn spawn_failure_is_failed_with_minus_one() {
    init_tracing();
    let mut core = core();

    let generation = core.begin_run("p1", None, Utc::now()).unwrap();
    let ticket = core.record_spawn_failed("p1", generation, "failed to spawn process: nope".into());

    assert_eq!(
        ticket,
        Some(ReapTicket {
            key: "p1".to_string(),
            generation
        })
    );
    let status = core.status("p1");
    assert_eq!(status.state, Some(RunState::Failed));
    assert_eq!(status.exit_code, Some(-1));
    assert_eq!(status.error.as_deref(), Some("failed to spawn process: nope"));
}

#[test]
fn wait_failure_keeps_the_partial_last_line() {
    init_tracing();
    let mut core = core();

    let generation = core.begin_run("p1", None, Utc::now()).unwrap();
    core.record_spawned("p1", generation, Some(7));
    core.record_output("p1", generation, StreamKind::Stdout, b"done\npartial");
    assert_eq!(core.output("p1", 0).lines, vec!["done"]);

    core.record_spawn_failed("p1", generation, "failed to wait on process: gone".into());

    assert_eq!(core.output("p1", 0).lines, vec!["done", "partial"]);
    assert_eq!(core.status("p1").state, Some(RunState::Failed));
}

#[test]
fn stop_is_terminal_and_later_exit_is_ignored() {
    init_tracing();
    let mut core = core();

    let generation = core.begin_run("p1", None, Utc::now()).unwrap();
    core.record_spawned("p1", generation, Some(7));

    assert_eq!(
        core.stop_target("p1"),
        Some(StopTarget {
            generation,
            pid: Some(7)
        })
    );
    assert!(core.record_stopped("p1", generation).is_some());
    assert_eq!(core.stop_target("p1"), None, "a second stop finds nothing to do");
    assert!(core.record_stopped("p1", generation).is_none());

    // The dying process may still print, then exits with SIGTERM's code.
    core.record_output("p1", generation, StreamKind::Stdout, b"shutting down\n");
    assert!(core.record_exit("p1", generation, ProcessExit::code(143)).is_none());

    let status = core.status("p1");
    assert_eq!(status.state, Some(RunState::Failed));
    assert_eq!(status.exit_code, Some(-1));
    assert!(status.stopped_by_user);
    assert_eq!(core.output("p1", 0).lines, vec!["shutting down"]);
}

#[test]
fn restart_replaces_finished_run_without_its_output() {
    init_tracing();
    let mut core = core();

    let first = core.begin_run("p1", None, Utc::now()).unwrap();
    core.record_output("p1", first, StreamKind::Stdout, b"old 1\nold 2\n");
    core.record_exit("p1", first, ProcessExit::code(1));
    assert_eq!(core.output("p1", 0).total, 2);

    let second = core.begin_run("p1", Some(Skill::Prd), Utc::now()).unwrap();
    assert!(second > first);

    let status = core.status("p1");
    assert!(status.running);
    assert_eq!(status.total_lines, 0);
    assert_eq!(status.skill, Some(Skill::Prd));
    assert_eq!(status.exit_code, None);
    assert!(core.output("p1", 0).lines.is_empty());
}

#[test]
fn events_from_a_replaced_run_are_dropped() {
    init_tracing();
    let mut core = core();

    let first = core.begin_run("p1", None, Utc::now()).unwrap();
    core.record_stopped("p1", first);
    let second = core.begin_run("p1", None, Utc::now()).unwrap();

    assert_eq!(core.record_output("p1", first, StreamKind::Stdout, b"late\n"), 0);
    assert!(core.record_exit("p1", first, ProcessExit::code(0)).is_none());

    let status = core.status("p1");
    assert!(status.running);
    assert_eq!(status.total_lines, 0);

    assert_eq!(core.record_output("p1", second, StreamKind::Stdout, b"fresh\n"), 1);
}

#[test]
fn reaper_only_removes_the_run_it_was_scheduled_for() {
    init_tracing();
    let mut core = core();

    let first = core.begin_run("p1", None, Utc::now()).unwrap();
    let stale = core.record_exit("p1", first, ProcessExit::code(0)).unwrap();

    let second = core.begin_run("p1", None, Utc::now()).unwrap();
    assert!(!core.reap(&stale), "ticket of the replaced run must not evict the new one");
    assert!(core.status("p1").running);

    let current = core.record_exit("p1", second, ProcessExit::code(0)).unwrap();
    assert!(core.reap(&current));
    assert!(core.status("p1").is_absent());
    assert!(core.registry().is_empty());
}

#[test]
fn clear_only_drops_terminal_runs() {
    init_tracing();
    let mut core = core();

    let generation = core.begin_run("p1", None, Utc::now()).unwrap();
    assert!(!core.clear("p1"));
    assert!(!core.clear("unknown"));

    core.record_exit("p1", generation, ProcessExit::code(0));
    assert!(core.clear("p1"));
    assert!(core.status("p1").is_absent());
}

#[test]
fn unknown_key_reads_are_empty() {
    init_tracing();
    let core = core();

    let status = core.status("nobody");
    assert!(!status.running);
    assert_eq!(status.state, None);

    let slice = core.output("nobody", 5);
    assert!(slice.lines.is_empty());
    assert_eq!(slice.total, 5);
}

#[test]
fn snapshot_serializes_in_camel_case() {
    init_tracing();
    let mut core = core();

    let generation = core.begin_run("p1", Some(Skill::PrdQuestions), Utc::now()).unwrap();
    core.record_stopped("p1", generation);

    let json = serde_json::to_value(core.status("p1")).unwrap();
    assert_eq!(json["running"], false);
    assert_eq!(json["exitCode"], -1);
    assert_eq!(json["stoppedByUser"], true);
    assert_eq!(json["state"], "failed");
    assert_eq!(json["skill"], "prd-questions");
    assert!(json.get("pid").is_none(), "no pid was recorded");
    assert!(json.get("startedAt").is_some());
}
