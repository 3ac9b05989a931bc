use super::scheduler::Scheduler;
use super::shared::Shared;
use crate::config::{load_toml_config, load_yaml_config, resolve_config_value, SchedulerConfig};
use crate::error::Result;
use crate::registry::{CoroutineEntry, COROUTINES};
use crate::task::{StepSequence, TaskDefinition};
use config::Config;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{info, warn};

/// Builder for the scheduler
pub struct SchedulerBuilder {
    pub(crate) config: Arc<Config>,
    pub(crate) definitions: Vec<TaskDefinition>,
    pub(crate) discover: bool,
    pub(crate) runtime: Option<Handle>,
}

impl Default for SchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerBuilder {
    /// Create a new scheduler builder with default config (empty)
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create with TOML config file
    pub fn with_toml(path: &str) -> Result<Self> {
        Ok(Self::with_config(load_toml_config(path)?))
    }

    /// Create with YAML config file
    pub fn with_yaml(path: &str) -> Result<Self> {
        Ok(Self::with_config(load_yaml_config(path)?))
    }

    /// Create with custom config
    pub fn with_config(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            definitions: Vec::new(),
            discover: false,
            runtime: None,
        }
    }

    /// Run task lanes on an existing runtime instead of a pool the scheduler
    /// builds itself.
    ///
    /// The runtime should be multi-threaded: stopping a task lane blocks the
    /// caller until the lane exits, which a single-threaded runtime driving
    /// that same lane could never do.
    pub fn with_runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Register a task factory under an explicit key.
    pub fn register<F, S>(mut self, key: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> S + Send + Sync + 'static,
        S: StepSequence + 'static,
    {
        self.definitions.push(TaskDefinition::new(key, factory));
        self
    }

    /// Also register every function marked with `#[routine]`.
    ///
    /// Each task's `enabled` setting is resolved against the configuration
    /// when the scheduler is built; disabled tasks are skipped.
    pub fn register_all(mut self) -> Self {
        self.discover = true;
        self
    }

    /// Build the scheduler
    ///
    /// Fails if the `scheduler` configuration table is malformed or an
    /// `enabled` placeholder names a missing key without a default.
    pub fn build(self) -> Result<Scheduler> {
        let settings = SchedulerConfig::from_config(&self.config)?;

        let mut definitions = self.definitions;
        if self.discover {
            let entries: Vec<CoroutineEntry> = COROUTINES.iter().map(|f| f()).collect();
            for entry in entries {
                let enabled = resolve_config_value(entry.enabled, &self.config)?;
                if enabled.eq_ignore_ascii_case("false") {
                    info!(key = entry.key, "Skipping disabled coroutine");
                    continue;
                }
                definitions.push((entry.define)());
            }
        }

        info!(
            tasks = definitions.len(),
            discovered = self.discover,
            external_runtime = self.runtime.is_some(),
            "Building scheduler"
        );

        let scheduler = Scheduler::from_shared(Shared::new(settings, self.runtime));
        for definition in definitions {
            let key = definition.key().to_string();
            if !scheduler.register_definition(definition) {
                warn!(%key, "Duplicate task key ignored");
            }
        }
        Ok(scheduler)
    }
}
