//! Tickflow Runtime - Core runtime for tick-driven coroutines
//!
//! This crate provides the scheduler, its lanes, and the step-sequence
//! abstraction that tasks are written against.

mod config;
mod error;
mod lane;
mod registry;
mod resume;
mod scheduler;
mod signal;
mod task;

// Re-export public API
pub use crate::config::{load_toml_config, load_yaml_config, resolve_config_value, SchedulerConfig};
pub use error::{Result, SchedulerError, StepFailure};
pub use lane::Lane;
pub use linkme;
pub use registry::{CoroutineEntry, COROUTINES};
pub use scheduler::{HostLoop, ManualHost, Scheduler, SchedulerBuilder, UpdateCallback};
pub use signal::Signal;
pub use task::{steps, BoxedSequence, StepSequence, TaskDefinition};
