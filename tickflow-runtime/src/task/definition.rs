use super::{BoxedSequence, StepSequence};
use std::fmt;
use std::sync::Arc;

type Factory = Arc<dyn Fn() -> BoxedSequence + Send + Sync>;

/// A named factory producing a fresh step sequence for every run of a task.
#[derive(Clone)]
pub struct TaskDefinition {
    key: String,
    factory: Factory,
}

impl TaskDefinition {
    pub fn new<F, S>(key: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> S + Send + Sync + 'static,
        S: StepSequence + 'static,
    {
        Self {
            key: key.into(),
            factory: Arc::new(move || Box::new(factory()) as BoxedSequence),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Create the sequence for a new run.
    pub fn instantiate(&self) -> BoxedSequence {
        (self.factory)()
    }
}

impl fmt::Debug for TaskDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDefinition")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}
