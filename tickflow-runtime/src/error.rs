use crate::lane::Lane;
use thiserror::Error;

/// Errors surfaced synchronously by scheduler operations.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// No task is registered under the key.
    #[error("task not found: {0}")]
    NotFound(String),

    /// The first resumption of a tick or physics start panicked.
    #[error("task '{key}' failed on the {lane} lane: {message}")]
    StepFailed {
        key: String,
        lane: Lane,
        message: String,
    },

    /// The scheduler has been shut down.
    #[error("scheduler is shut down")]
    ShutDown,

    /// Configuration could not be loaded or deserialized.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// The task-lane pool or a lane thread could not be created.
    #[error("runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Report of a resumption that panicked after the instance was started.
///
/// The instance is already terminated when the report is delivered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("task '{key}' failed on the {lane} lane: {message}")]
pub struct StepFailure {
    pub key: String,
    pub lane: Lane,
    pub message: String,
}

impl From<StepFailure> for SchedulerError {
    fn from(failure: StepFailure) -> Self {
        SchedulerError::StepFailed {
            key: failure.key,
            lane: failure.lane,
            message: failure.message,
        }
    }
}
