use crate::lane::Lane;
use crate::task::TaskDefinition;
use std::collections::{HashMap, HashSet};

/// Link-time entry emitted by `#[routine]`
#[derive(Debug, Clone)]
pub struct CoroutineEntry {
    pub key: &'static str,
    /// `"true"`, `"false"`, or a `${path}` / `${path:default}` config placeholder
    pub enabled: &'static str,
    pub define: fn() -> TaskDefinition,
}

/// Global distributed slice for collecting `#[routine]` tasks
#[linkme::distributed_slice]
pub static COROUTINES: [fn() -> CoroutineEntry] = [..];

/// Task definitions by key, plus which lanes each key is live on.
///
/// The owner must update liveness in the same critical section that adds or
/// removes the corresponding running instance.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    definitions: HashMap<String, TaskDefinition>,
    live: HashMap<String, HashSet<Lane>>,
}

impl Registry {
    /// Store a definition unless one already exists under its key.
    /// Returns whether it was stored.
    pub(crate) fn register(&mut self, definition: TaskDefinition) -> bool {
        if self.definitions.contains_key(definition.key()) {
            return false;
        }
        self.definitions
            .insert(definition.key().to_string(), definition);
        true
    }

    pub(crate) fn definition(&self, key: &str) -> Option<&TaskDefinition> {
        self.definitions.get(key)
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.definitions.contains_key(key)
    }

    pub(crate) fn is_running(&self, key: &str) -> bool {
        self.live.get(key).is_some_and(|lanes| !lanes.is_empty())
    }

    pub(crate) fn is_running_on(&self, key: &str, lane: Lane) -> bool {
        self.live.get(key).is_some_and(|lanes| lanes.contains(&lane))
    }

    pub(crate) fn mark_live(&mut self, key: &str, lane: Lane) {
        self.live.entry(key.to_string()).or_default().insert(lane);
    }

    pub(crate) fn clear_live(&mut self, key: &str, lane: Lane) {
        if let Some(lanes) = self.live.get_mut(key) {
            lanes.remove(&lane);
            if lanes.is_empty() {
                self.live.remove(key);
            }
        }
    }

    /// Drop all liveness and definitions.
    pub(crate) fn release(&mut self) {
        self.live.clear();
        self.definitions.clear();
    }
}
