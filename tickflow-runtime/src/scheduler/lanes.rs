//! Thread and task lanes: drive a whole step sequence on their own
//! execution context, independent of the host's ticks.

use super::handle::{enter_thread_run, scope_task_run};
use super::shared::Shared;
use crate::lane::Lane;
use crate::resume::{self, Outcome, Pace};
use crate::task::{BoxedSequence, TaskDefinition};
use crossbeam::channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::future::Future;
use std::sync::Weak;
use tokio::sync::watch;
use tracing::{debug, trace};

/// Everything a lane needs to run one task and clean up after itself.
pub(crate) struct LaneRun {
    pub(crate) shared: Weak<Shared>,
    pub(crate) definition: TaskDefinition,
    pub(crate) lane: Lane,
    pub(crate) run_id: u64,
}

impl LaneRun {
    fn key(&self) -> &str {
        self.definition.key()
    }

    fn step(&self, sequence: &mut BoxedSequence) -> Outcome {
        let outcome = resume::resume(sequence.as_mut());
        trace!(key = %self.key(), lane = %self.lane, ?outcome, "Resumed");
        outcome
    }

    /// Remove this run's bookkeeping and report a failure, if any.
    fn retire(&self, failure: Option<String>) {
        debug!(key = %self.key(), lane = %self.lane, failed = failure.is_some(), "Lane finished");
        if let Some(shared) = self.shared.upgrade() {
            shared.retire_lane(self.definition.key(), self.lane, self.run_id, failure);
        }
    }
}

/// Owns a run for the lifetime of its lane and retires it when dropped, so
/// bookkeeping is cleared even when a runtime drops the lane's future.
struct Retiring {
    run: LaneRun,
    failure: Option<String>,
}

impl Retiring {
    fn new(run: LaneRun) -> Self {
        Self { run, failure: None }
    }
}

impl Drop for Retiring {
    fn drop(&mut self) {
        self.run.retire(self.failure.take());
    }
}

/// Body of a thread-lane OS thread.
pub(crate) fn run_on_thread(run: LaneRun, stop: Receiver<()>) {
    enter_thread_run(run.run_id);
    let mut lane = Retiring::new(run);
    lane.failure = drive_blocking(&lane.run, &stop).err();
}

fn drive_blocking(run: &LaneRun, stop: &Receiver<()>) -> Result<(), String> {
    let mut sequence = resume::instantiate(&run.definition)?;
    loop {
        if matches!(stop.try_recv(), Err(TryRecvError::Disconnected)) {
            debug!(key = %run.key(), "Thread lane cancelled");
            return Ok(());
        }

        let outcome = run.step(&mut sequence);
        match outcome.pace() {
            Some(Pace::Immediately) => {}
            Some(Pace::After(duration)) => match stop.recv_timeout(duration) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    debug!(key = %run.key(), "Thread lane cancelled while waiting");
                    return Ok(());
                }
            },
            None => {
                return match outcome {
                    Outcome::Failed(message) => Err(message),
                    _ => Ok(()),
                };
            }
        }
    }
}

/// Body of a task-lane future.
///
/// The run is captured before the first poll, so dropping the future at any
/// point retires it. `done` goes with it, which is what `cancel` waits for.
pub(crate) fn run_on_task(
    run: LaneRun,
    stop: watch::Receiver<bool>,
    done: Sender<()>,
) -> impl Future<Output = ()> + Send {
    let lane = Retiring::new(run);
    async move {
        // declared first so it drops last, after the run is retired
        let _done = done;
        let mut lane = lane;
        let run_id = lane.run.run_id;
        let failure = scope_task_run(run_id, drive_async(&lane.run, stop)).await.err();
        lane.failure = failure;
    }
}

async fn drive_async(run: &LaneRun, mut stop: watch::Receiver<bool>) -> Result<(), String> {
    let mut sequence = resume::instantiate(&run.definition)?;
    loop {
        if stop.has_changed().is_err() {
            debug!(key = %run.key(), "Task lane cancelled");
            return Ok(());
        }

        let outcome = run.step(&mut sequence);
        match outcome.pace() {
            Some(Pace::Immediately) => tokio::task::yield_now().await,
            Some(Pace::After(duration)) => {
                tokio::select! {
                    _ = tokio::time::sleep(duration) => {}
                    _ = stop.changed() => {
                        debug!(key = %run.key(), "Task lane cancelled while waiting");
                        return Ok(());
                    }
                }
            }
            None => {
                return match outcome {
                    Outcome::Failed(message) => Err(message),
                    _ => Ok(()),
                };
            }
        }
    }
}
