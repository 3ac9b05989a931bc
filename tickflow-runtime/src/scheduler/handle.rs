use crossbeam::channel::{Receiver, Sender};
use std::cell::Cell;
use std::thread::JoinHandle;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::watch;

thread_local! {
    static THREAD_RUN: Cell<Option<u64>> = const { Cell::new(None) };
}

tokio::task_local! {
    static TASK_RUN: u64;
}

/// Run id of the thread or task lane executing the caller, if any.
pub(crate) fn current_run() -> Option<u64> {
    THREAD_RUN
        .with(Cell::get)
        .or_else(|| TASK_RUN.try_with(|id| *id).ok())
}

/// Mark the current OS thread as belonging to a thread-lane run.
pub(crate) fn enter_thread_run(run_id: u64) {
    THREAD_RUN.with(|run| run.set(Some(run_id)));
}

/// Scope a task-lane future so code it runs can tell which run it belongs to.
pub(crate) async fn scope_task_run<F: std::future::Future>(run_id: u64, future: F) -> F::Output {
    TASK_RUN.scope(run_id, future).await
}

/// Control side of a thread or task lane.
///
/// Dropping the stop sender is the cancellation request; the lane notices it
/// at its next checkpoint or while waiting.
pub(crate) enum LaneHandle {
    Thread {
        stop: Sender<()>,
        join: JoinHandle<()>,
    },
    Task {
        stop: watch::Sender<bool>,
        /// Disconnects when the lane future is dropped
        done: Receiver<()>,
    },
}

impl LaneHandle {
    /// Request cooperative termination and wait for the lane to exit.
    ///
    /// A lane cancelling itself is only signalled; it exits at its next checkpoint.
    pub(crate) fn cancel(self, run_id: u64) {
        let own_lane = current_run() == Some(run_id);
        match self {
            LaneHandle::Thread { stop, join } => {
                drop(stop);
                if !own_lane {
                    wait_blocking(|| {
                        // steps are resumed under catch_unwind, so this only
                        // errs if the lane bookkeeping itself panicked
                        let _ = join.join();
                    });
                }
            }
            LaneHandle::Task { stop, done } => {
                drop(stop);
                if !own_lane {
                    wait_blocking(|| {
                        let _ = done.recv();
                    });
                }
            }
        }
    }
}

/// Block on `f`, stepping out of a multi-threaded runtime's worker first so
/// other tasks keep running.
fn wait_blocking<F: FnOnce()>(f: F) {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}
