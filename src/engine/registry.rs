// src/engine/registry.rs

//! Keyed store of runs for one run kind.

use std::collections::HashMap;

use tracing::debug;

use crate::engine::run::Run;
use crate::types::{Generation, RunKey};

/// Maps an owner key to its current run.
///
/// Identity of a run is its generation, handed out by
/// [`RunRegistry::next_generation`]. Anything that acts on a run later
/// (process events, reaper timers) names the generation it saw, and the
/// registry ignores it if the key has moved on to a newer run.
#[derive(Debug, Default)]
pub struct RunRegistry {
    runs: HashMap<RunKey, Run>,
    last_generation: Generation,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh generation. Never repeats within this registry.
    pub fn next_generation(&mut self) -> Generation {
        self.last_generation += 1;
        self.last_generation
    }

    pub fn get(&self, key: &str) -> Option<&Run> {
        self.runs.get(key)
    }

    /// The run for `key`, only if it is still the given generation.
    pub fn get_current_mut(&mut self, key: &str, generation: Generation) -> Option<&mut Run> {
        self.runs
            .get_mut(key)
            .filter(|run| run.generation() == generation)
    }

    pub fn current_generation(&self, key: &str) -> Option<Generation> {
        self.runs.get(key).map(Run::generation)
    }

    /// Store `run` under its key, returning the run it replaced.
    pub fn insert(&mut self, run: Run) -> Option<Run> {
        self.runs.insert(run.key().to_string(), run)
    }

    /// Remove the run for `key` if it is still the given generation.
    pub fn remove_if_current(&mut self, key: &str, generation: Generation) -> bool {
        if self.current_generation(key) != Some(generation) {
            debug!(key, generation, "entry superseded or already gone; not removing");
            return false;
        }
        self.runs.remove(key).is_some()
    }

    /// Remove the run for `key` if it has finished.
    pub fn remove_terminal(&mut self, key: &str) -> bool {
        match self.runs.get(key) {
            Some(run) if run.is_terminal() => self.runs.remove(key).is_some(),
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.runs.keys().map(String::as_str)
    }
}
