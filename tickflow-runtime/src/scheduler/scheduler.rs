use super::host::HostLoop;
use super::shared::Shared;
use crate::config::SchedulerConfig;
use crate::error::{Result, StepFailure};
use crate::lane::Lane;
use crate::task::{StepSequence, TaskDefinition};
use std::sync::Arc;
use std::time::Duration;

/// Cooperative task scheduler for step-based host loops.
///
/// Cloning is cheap; every clone drives the same registry and lanes. State
/// is released by [`Scheduler::shutdown`], or when the last clone is dropped.
///
/// # Example
///
/// ```rust
/// use tickflow_runtime::{steps, SchedulerBuilder};
/// use std::time::Duration;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let scheduler = SchedulerBuilder::new().build()?;
/// scheduler.register("blink", || {
///     steps::script()
///         .run(|| println!("on"))
///         .wait(Duration::from_millis(250))
///         .run(|| println!("off"))
/// });
///
/// assert!(scheduler.start_if_not_running("blink")?);
/// scheduler.tick(Duration::from_millis(300));
/// assert!(!scheduler.is_running("blink"));
/// scheduler.shutdown();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Scheduler {
    shared: Arc<Shared>,
}

impl Scheduler {
    pub(crate) fn from_shared(shared: Shared) -> Self {
        Self {
            shared: Arc::new(shared),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        self.shared.config()
    }

    /// Register a task factory under `key`.
    ///
    /// Registering a key twice keeps the first factory. Returns whether the
    /// factory was stored.
    pub fn register<F, S>(&self, key: impl Into<String>, factory: F) -> bool
    where
        F: Fn() -> S + Send + Sync + 'static,
        S: StepSequence + 'static,
    {
        self.shared.register(TaskDefinition::new(key, factory))
    }

    pub fn register_definition(&self, definition: TaskDefinition) -> bool {
        self.shared.register(definition)
    }

    pub fn is_registered(&self, key: &str) -> bool {
        self.shared.is_registered(key)
    }

    /// Whether `key` has a running instance on any lane.
    pub fn is_running(&self, key: &str) -> bool {
        self.shared.is_running(key)
    }

    pub fn is_running_on(&self, key: &str, lane: Lane) -> bool {
        self.shared.is_running_on(key, lane)
    }

    /// Keys currently running on `lane`; insertion order for tick lanes.
    pub fn running_keys(&self, lane: Lane) -> Vec<String> {
        self.shared.running_keys(lane)
    }

    /// Start `key` on `lane` unless it is already running there.
    ///
    /// Returns `Ok(false)` when the key is busy on that lane and
    /// `Err(SchedulerError::NotFound)` when it was never registered. On the
    /// tick and physics lanes the first resumption happens before this returns.
    pub fn start(&self, key: &str, lane: Lane) -> Result<bool> {
        if lane.is_tick_driven() {
            self.shared.start_ticked(key, lane)
        } else {
            self.shared.start_lane(key, lane)
        }
    }

    /// Start `key` on the tick lane.
    pub fn start_if_not_running(&self, key: &str) -> Result<bool> {
        self.start(key, Lane::Tick)
    }

    /// Start `key` on the physics lane.
    pub fn start_physics_if_not_running(&self, key: &str) -> Result<bool> {
        self.start(key, Lane::Physics)
    }

    /// Run `key` to completion on a dedicated thread.
    pub fn start_on_thread(&self, key: &str) -> Result<bool> {
        self.start(key, Lane::Thread)
    }

    /// Run `key` to completion on the task pool.
    pub fn start_on_task(&self, key: &str) -> Result<bool> {
        self.start(key, Lane::Task)
    }

    /// Stop `key` on every lane. Thread and task lanes are cancelled
    /// cooperatively and waited for. Returns whether anything was running.
    pub fn stop(&self, key: &str) -> bool {
        Lane::ALL
            .iter()
            .fold(false, |stopped, lane| self.shared.stop_lane(key, *lane) || stopped)
    }

    /// Stop `key` on one lane, leaving its other lanes alone.
    pub fn stop_lane(&self, key: &str, lane: Lane) -> bool {
        self.shared.stop_lane(key, lane)
    }

    /// Advance the tick lane by `delta`. Call once per host frame.
    pub fn tick(&self, delta: Duration) {
        self.shared.process(Lane::Tick, delta);
    }

    /// Advance the physics lane by `delta`. Call once per fixed step.
    pub fn physics_tick(&self, delta: Duration) {
        self.shared.process(Lane::Physics, delta);
    }

    /// Wire `tick` and `physics_tick` into a host's update callbacks.
    ///
    /// The callbacks hold a weak reference, so they never keep the scheduler
    /// alive and become no-ops once it is shut down or dropped.
    pub fn attach<H: HostLoop + ?Sized>(&self, host: &mut H) {
        let frame = Arc::downgrade(&self.shared);
        host.on_process(Box::new(move |delta| {
            if let Some(shared) = frame.upgrade() {
                shared.process(Lane::Tick, delta);
            }
        }));

        let fixed = Arc::downgrade(&self.shared);
        host.on_physics_process(Box::new(move |delta| {
            if let Some(shared) = fixed.upgrade() {
                shared.process(Lane::Physics, delta);
            }
        }));
    }

    /// Failures reported since the last call, oldest first.
    pub fn take_failures(&self) -> Vec<StepFailure> {
        self.shared.take_failures()
    }

    /// Wait up to `timeout` for the next failure report.
    pub fn wait_failure(&self, timeout: Duration) -> Option<StepFailure> {
        self.shared.wait_failure(timeout)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.is_closed()
    }

    /// Cancel every lane, wait for each to exit, and release all state.
    ///
    /// Subsequent ticks do nothing and starts fail with
    /// `SchedulerError::ShutDown`. Calling it again is a no-op.
    pub fn shutdown(&self) {
        self.shared.shutdown();
    }
}
