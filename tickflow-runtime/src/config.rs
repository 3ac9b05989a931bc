use crate::error::Result;
use config::{Config, File, FileFormat};
use serde::Deserialize;
use std::path::Path;

/// Lane settings read from the `scheduler` table of the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Name given to thread-lane OS threads (the task key is appended)
    pub thread_name_prefix: String,
    /// Worker threads of the task-lane pool when the scheduler owns it
    pub task_worker_threads: usize,
    /// Thread name of the task-lane pool workers
    pub task_thread_name: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            thread_name_prefix: "tickflow-lane".to_string(),
            task_worker_threads: 2,
            task_thread_name: "tickflow-task".to_string(),
        }
    }
}

impl SchedulerConfig {
    /// Extract the `scheduler` table, falling back to defaults when absent.
    pub fn from_config(config: &Config) -> Result<Self> {
        match config.get::<SchedulerConfig>("scheduler") {
            Ok(settings) => Ok(settings),
            Err(config::ConfigError::NotFound(_)) => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Load config from a specific TOML file
pub fn load_toml_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let config = Config::builder()
        .add_source(File::from(path.as_ref()).format(FileFormat::Toml))
        .add_source(config::Environment::with_prefix("APP").separator("_"))
        .build()?;
    Ok(config)
}

/// Load config from a specific YAML file
pub fn load_yaml_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let config = Config::builder()
        .add_source(File::from(path.as_ref()).format(FileFormat::Yaml))
        .add_source(config::Environment::with_prefix("APP").separator("_"))
        .build()?;
    Ok(config)
}

/// Resolve config placeholder like ${app.enabled} or ${app.enabled:true}
pub fn resolve_config_value(value: &str, config: &Config) -> Result<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let inner = &value[2..value.len() - 1];

        // ${app.enabled:true} falls back to the text after the colon
        if let Some(colon_pos) = inner.find(':') {
            let key = &inner[..colon_pos];
            let default_value = &inner[colon_pos + 1..];

            match config.get_string(key) {
                Ok(resolved) => Ok(resolved),
                Err(_) => Ok(default_value.to_string()),
            }
        } else {
            let resolved = config.get_string(inner)?;
            Ok(resolved)
        }
    } else {
        Ok(value.to_string())
    }
}
