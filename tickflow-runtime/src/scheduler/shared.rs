use super::handle::{current_run, LaneHandle};
use super::instance::{Poll, RunSet, Settled};
use super::lanes::{run_on_task, run_on_thread, LaneRun};
use crate::config::SchedulerConfig;
use crate::error::{Result, SchedulerError, StepFailure};
use crate::lane::Lane;
use crate::registry::Registry;
use crate::resume::{self, Outcome};
use crate::task::{BoxedSequence, TaskDefinition};
use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Handle, Runtime};
use tokio::sync::watch;
use tracing::{debug, error, info, trace, warn};

/// Run ids are process-wide so a lane can tell its own run apart from any
/// other scheduler's.
static NEXT_RUN: AtomicU64 = AtomicU64::new(1);

struct LaneEntry {
    run_id: u64,
    handle: LaneHandle,
}

/// Everything guarded by the scheduler lock.
///
/// Running sets and liveness are only changed together while this is held.
pub(crate) struct Core {
    registry: Registry,
    tick: RunSet,
    physics: RunSet,
    lanes: HashMap<(String, Lane), LaneEntry>,
}

impl Core {
    fn new() -> Self {
        Self {
            registry: Registry::default(),
            tick: RunSet::new(),
            physics: RunSet::new(),
            lanes: HashMap::new(),
        }
    }

    fn run_set(&mut self, lane: Lane) -> &mut RunSet {
        match lane {
            Lane::Physics => &mut self.physics,
            _ => &mut self.tick,
        }
    }

    fn next_run_id(&self) -> u64 {
        NEXT_RUN.fetch_add(1, Ordering::Relaxed)
    }

    fn definition(&self, key: &str) -> Result<TaskDefinition> {
        self.registry
            .definition(key)
            .cloned()
            .ok_or_else(|| SchedulerError::NotFound(key.to_string()))
    }

    /// Detach the lane entry for `key` so it can be cancelled outside the lock.
    fn take_lane(&mut self, key: &str, lane: Lane) -> Option<LaneEntry> {
        let entry = self.lanes.remove(&(key.to_string(), lane))?;
        self.registry.clear_live(key, lane);
        Some(entry)
    }
}

/// Pool the task lane spawns onto: a caller-supplied runtime, or one the
/// scheduler builds on first use and shuts down with itself.
pub(crate) struct TaskPool {
    external: Option<Handle>,
    owned: Mutex<Option<Runtime>>,
    worker_threads: usize,
    thread_name: String,
}

impl TaskPool {
    pub(crate) fn new(external: Option<Handle>, config: &SchedulerConfig) -> Self {
        Self {
            external,
            owned: Mutex::new(None),
            worker_threads: config.task_worker_threads.max(1),
            thread_name: config.task_thread_name.clone(),
        }
    }

    fn handle(&self) -> Result<Handle> {
        if let Some(handle) = &self.external {
            return Ok(handle.clone());
        }

        let mut owned = self.owned.lock();
        if let Some(runtime) = owned.as_ref() {
            return Ok(runtime.handle().clone());
        }
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.worker_threads)
            .thread_name(self.thread_name.clone())
            .enable_all()
            .build()?;
        info!(workers = self.worker_threads, "Task lane pool started");
        let handle = runtime.handle().clone();
        *owned = Some(runtime);
        Ok(handle)
    }

    fn shutdown(&self) {
        if let Some(runtime) = self.owned.lock().take() {
            runtime.shutdown_background();
        }
    }
}

/// State shared by every clone of a `Scheduler` and weakly by its lanes.
pub(crate) struct Shared {
    core: Mutex<Core>,
    closed: AtomicBool,
    /// Held for the whole of a teardown so concurrent callers wait it out
    teardown: Mutex<()>,
    failures_tx: Sender<StepFailure>,
    failures_rx: Receiver<StepFailure>,
    pool: TaskPool,
    config: SchedulerConfig,
}

impl Shared {
    pub(crate) fn new(config: SchedulerConfig, runtime: Option<Handle>) -> Self {
        let (failures_tx, failures_rx) = channel::unbounded();
        Self {
            core: Mutex::new(Core::new()),
            closed: AtomicBool::new(false),
            teardown: Mutex::new(()),
            failures_tx,
            failures_rx,
            pool: TaskPool::new(runtime, &config),
            config,
        }
    }

    pub(crate) fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            warn!("Operation rejected: scheduler is shut down");
            return Err(SchedulerError::ShutDown);
        }
        Ok(())
    }

    pub(crate) fn register(&self, definition: TaskDefinition) -> bool {
        let key = definition.key().to_string();
        let mut core = self.core.lock();
        if self.is_closed() {
            warn!(%key, "Registration ignored: scheduler is shut down");
            return false;
        }
        let stored = core.registry.register(definition);
        drop(core);
        if stored {
            debug!(%key, "Registered task");
        }
        stored
    }

    pub(crate) fn is_registered(&self, key: &str) -> bool {
        self.core.lock().registry.contains(key)
    }

    pub(crate) fn is_running(&self, key: &str) -> bool {
        self.core.lock().registry.is_running(key)
    }

    pub(crate) fn is_running_on(&self, key: &str, lane: Lane) -> bool {
        self.core.lock().registry.is_running_on(key, lane)
    }

    pub(crate) fn running_keys(&self, lane: Lane) -> Vec<String> {
        let core = self.core.lock();
        match lane {
            Lane::Tick => core.tick.keys(),
            Lane::Physics => core.physics.keys(),
            Lane::Thread | Lane::Task => {
                let mut keys: Vec<String> = core
                    .lanes
                    .keys()
                    .filter(|(_, l)| *l == lane)
                    .map(|(key, _)| key.clone())
                    .collect();
                keys.sort();
                keys
            }
        }
    }

    /// Start `key` on a tick-driven lane, running its first resumption
    /// before returning.
    pub(crate) fn start_ticked(&self, key: &str, lane: Lane) -> Result<bool> {
        let (definition, run_id) = {
            let mut core = self.core.lock();
            self.ensure_open()?;
            let definition = core.definition(key)?;
            if core.run_set(lane).contains(key) {
                return Ok(false);
            }
            let run_id = core.next_run_id();
            core.run_set(lane).reserve(key, run_id);
            core.registry.mark_live(key, lane);
            (definition, run_id)
        };
        debug!(%key, %lane, run_id, "Starting task");

        // user code runs without the lock so steps may call back into the scheduler
        let first = resume::instantiate(&definition).map(|mut sequence| {
            let outcome = resume::resume(sequence.as_mut());
            (sequence, outcome)
        });

        let settled = match first {
            Ok((sequence, outcome)) => self.settle(key, lane, run_id, sequence, outcome, true),
            Err(message) => {
                let mut core = self.core.lock();
                if core.run_set(lane).remove(key) {
                    core.registry.clear_live(key, lane);
                }
                Settled::Failed(message)
            }
        };

        match settled {
            Settled::Failed(message) => {
                error!(%key, %lane, %message, "Task failed on its first step");
                Err(SchedulerError::StepFailed {
                    key: key.to_string(),
                    lane,
                    message,
                })
            }
            _ => Ok(true),
        }
    }

    fn settle(
        &self,
        key: &str,
        lane: Lane,
        run_id: u64,
        sequence: BoxedSequence,
        outcome: Outcome,
        first: bool,
    ) -> Settled {
        let mut core = self.core.lock();
        let settled = core.run_set(lane).settle(key, run_id, sequence, outcome, first);
        if matches!(settled, Settled::Removed | Settled::Failed(_)) {
            core.registry.clear_live(key, lane);
        }
        settled
    }

    /// One pass of a tick-driven lane over a snapshot of its running set.
    pub(crate) fn process(&self, lane: Lane, delta: Duration) {
        if self.is_closed() {
            return;
        }

        let snapshot = self.core.lock().run_set(lane).snapshot();
        for (key, run_id) in snapshot {
            // a step may have shut the scheduler down mid-scan
            if self.is_closed() {
                break;
            }
            let mut sequence = {
                let mut core = self.core.lock();
                match core.run_set(lane).poll(&key, run_id, delta) {
                    Poll::Resume(sequence) => sequence,
                    Poll::Removed => {
                        core.registry.clear_live(&key, lane);
                        debug!(%key, %lane, "Task ended");
                        continue;
                    }
                    Poll::Pending | Poll::Skip => continue,
                }
            };

            let outcome = resume::resume(sequence.as_mut());
            trace!(%key, %lane, ?outcome, "Resumed");
            match self.settle(&key, lane, run_id, sequence, outcome, false) {
                Settled::Removed => debug!(%key, %lane, "Task completed"),
                Settled::Failed(message) => self.report(StepFailure {
                    key: key.clone(),
                    lane,
                    message,
                }),
                Settled::Kept | Settled::Gone => {}
            }
        }
    }

    /// Launch `key` on a thread or task lane. The lane instantiates and
    /// drives the sequence itself.
    pub(crate) fn start_lane(self: &Arc<Self>, key: &str, lane: Lane) -> Result<bool> {
        let mut core = self.core.lock();
        self.ensure_open()?;
        let definition = core.definition(key)?;
        let slot = (key.to_string(), lane);
        if core.lanes.contains_key(&slot) {
            return Ok(false);
        }

        let run_id = core.next_run_id();
        let run = LaneRun {
            shared: Arc::downgrade(self),
            definition,
            lane,
            run_id,
        };

        if lane == Lane::Thread {
            let handle = self.spawn_thread(key, run)?;
            core.lanes.insert(slot, LaneEntry { run_id, handle });
            core.registry.mark_live(key, lane);
        } else {
            let pool = self.pool.handle()?;
            let (stop, stop_rx) = watch::channel(false);
            let (done_tx, done) = channel::bounded(1);
            let handle = LaneHandle::Task { stop, done };
            core.lanes.insert(slot, LaneEntry { run_id, handle });
            core.registry.mark_live(key, lane);
            drop(core);
            // a runtime that is shutting down drops the future right here,
            // and dropping it retires the run, which needs the lock
            pool.spawn(run_on_task(run, stop_rx, done_tx));
        }

        debug!(%key, %lane, run_id, "Lane started");
        Ok(true)
    }

    fn spawn_thread(&self, key: &str, run: LaneRun) -> Result<LaneHandle> {
        let (stop, stop_rx) = channel::bounded(1);
        // OS thread names cannot carry interior NULs
        let name = format!("{}-{}", self.config.thread_name_prefix, key).replace('\0', "");
        let join = std::thread::Builder::new()
            .name(name)
            .spawn(move || run_on_thread(run, stop_rx))?;
        Ok(LaneHandle::Thread { stop, join })
    }

    /// Called by a lane when it exits on its own or its future is dropped.
    pub(crate) fn retire_lane(&self, key: &str, lane: Lane, run_id: u64, failure: Option<String>) {
        {
            let mut core = self.core.lock();
            let slot = (key.to_string(), lane);
            if core.lanes.get(&slot).is_some_and(|entry| entry.run_id == run_id) {
                // our own handle; dropping it detaches the finished context
                core.lanes.remove(&slot);
                core.registry.clear_live(key, lane);
            }
        }
        if let Some(message) = failure {
            self.report(StepFailure {
                key: key.to_string(),
                lane,
                message,
            });
        }
    }

    /// Stop `key` on one lane. Returns whether something was running there.
    pub(crate) fn stop_lane(&self, key: &str, lane: Lane) -> bool {
        if lane.is_tick_driven() {
            let mut core = self.core.lock();
            let removed = core.run_set(lane).remove(key);
            if removed {
                core.registry.clear_live(key, lane);
                debug!(%key, %lane, "Task stopped");
            }
            return removed;
        }

        let entry = self.core.lock().take_lane(key, lane);
        match entry {
            Some(entry) => {
                debug!(%key, %lane, run_id = entry.run_id, "Cancelling lane");
                entry.handle.cancel(entry.run_id);
                true
            }
            None => false,
        }
    }

    fn report(&self, failure: StepFailure) {
        error!(key = %failure.key, lane = %failure.lane, message = %failure.message, "Task step failed");
        // the receiver lives as long as `self`
        let _ = self.failures_tx.send(failure);
    }

    pub(crate) fn take_failures(&self) -> Vec<StepFailure> {
        self.failures_rx.try_iter().collect()
    }

    pub(crate) fn wait_failure(&self, timeout: Duration) -> Option<StepFailure> {
        self.failures_rx.recv_timeout(timeout).ok()
    }

    /// Cancel everything and release all state. Safe to call more than once;
    /// a call made while another is in progress returns once that one is done.
    ///
    /// A lane calling this cannot wait for a teardown that is joining it, so
    /// it leaves the work to a teardown already in progress.
    pub(crate) fn shutdown(&self) {
        let _teardown = if current_run().is_some() {
            match self.teardown.try_lock() {
                Some(guard) => guard,
                None => return,
            }
        } else {
            self.teardown.lock()
        };
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let lanes: Vec<((String, Lane), LaneEntry)> = {
            let mut core = self.core.lock();
            core.tick.clear();
            core.physics.clear();
            core.registry.release();
            core.lanes.drain().collect()
        };

        info!(lanes = lanes.len(), "Shutting down scheduler");
        for ((key, lane), entry) in lanes {
            debug!(%key, %lane, run_id = entry.run_id, "Cancelling lane");
            entry.handle.cancel(entry.run_id);
        }
        self.pool.shutdown();
        info!("Scheduler shut down");
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.shutdown();
    }
}
