// crates/test-utils/src/fake_backend.rs

use std::io;
use std::sync::{Arc, Mutex};

use runboard::exec::{ProcessBackend, ProcessSink, TerminateOutcome};
use runboard::launch::LaunchSpec;

/// One launch seen by the fake backend.
#[derive(Debug, Clone)]
pub struct SpawnRecord {
    pub pid: u32,
    pub spec: LaunchSpec,
    pub sink: ProcessSink,
}

#[derive(Debug, Default)]
struct FakeState {
    next_pid: u32,
    spawned: Vec<SpawnRecord>,
    terminated: Vec<u32>,
    fail_next_spawn: Option<String>,
}

/// A process backend that never runs anything.
///
/// - records every launch together with the sink it was handed, so a test
///   can push output and exits on behalf of the "process"
/// - records terminate requests and reports the tree as signalled
/// - can be told to fail the next spawn
///
/// Clones share state: keep one clone in the test, give the other to the
/// supervisor.
#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<FakeState>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        let backend = Self::default();
        backend.state.lock().unwrap().next_pid = 1000;
        backend
    }

    /// Make the next `spawn` fail with an OS-style error.
    pub fn fail_next_spawn(&self, message: &str) {
        self.state.lock().unwrap().fail_next_spawn = Some(message.to_string());
    }

    pub fn spawned(&self) -> Vec<SpawnRecord> {
        self.state.lock().unwrap().spawned.clone()
    }

    pub fn terminated(&self) -> Vec<u32> {
        self.state.lock().unwrap().terminated.clone()
    }

    /// Sink of the most recent launch for `key`.
    pub fn sink_for(&self, key: &str) -> Option<ProcessSink> {
        self.state
            .lock()
            .unwrap()
            .spawned
            .iter()
            .rev()
            .find(|r| r.sink.key() == key)
            .map(|r| r.sink.clone())
    }
}

impl ProcessBackend for FakeBackend {
    fn spawn(&mut self, spec: LaunchSpec, sink: ProcessSink) -> io::Result<Option<u32>> {
        let mut state = self.state.lock().unwrap();
        if let Some(message) = state.fail_next_spawn.take() {
            return Err(io::Error::new(io::ErrorKind::NotFound, message));
        }
        state.next_pid += 1;
        let pid = state.next_pid;
        state.spawned.push(SpawnRecord { pid, spec, sink });
        Ok(Some(pid))
    }

    fn terminate_tree(&mut self, pid: u32) -> TerminateOutcome {
        self.state.lock().unwrap().terminated.push(pid);
        TerminateOutcome::TreeSignalled
    }
}
