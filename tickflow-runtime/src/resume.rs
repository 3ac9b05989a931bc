//! The single resume step shared by every lane.
//!
//! Lanes differ only in how they honour the returned signal: tick lanes park
//! the instance until enough tick time accumulates, thread lanes block, task
//! lanes sleep asynchronously.

use crate::signal::Signal;
use crate::task::{BoxedSequence, StepSequence, TaskDefinition};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

/// Result of resuming a sequence once.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Outcome {
    /// The sequence yielded a signal other than `End`.
    Yielded(Signal),
    /// The sequence yielded `End` or ran out of steps.
    Finished,
    /// The resumption panicked; carries the panic message.
    Failed(String),
}

/// What a self-driving lane does after a resumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pace {
    Immediately,
    After(Duration),
}

impl Outcome {
    /// Pacing for a lane that drives the sequence in real time.
    /// `None` means the lane loop is over.
    pub(crate) fn pace(&self) -> Option<Pace> {
        match self {
            Outcome::Yielded(Signal::Wait(duration)) if !duration.is_zero() => {
                Some(Pace::After(*duration))
            }
            Outcome::Yielded(_) => Some(Pace::Immediately),
            Outcome::Finished | Outcome::Failed(_) => None,
        }
    }
}

/// Resume `sequence` once, containing any panic raised by the step body.
pub(crate) fn resume(sequence: &mut dyn StepSequence) -> Outcome {
    match panic::catch_unwind(AssertUnwindSafe(|| sequence.resume())) {
        Ok(Some(Signal::End)) | Ok(None) => Outcome::Finished,
        Ok(Some(signal)) => Outcome::Yielded(signal),
        Err(payload) => Outcome::Failed(panic_message(payload.as_ref())),
    }
}

/// Build a fresh sequence for a run, containing a panicking factory.
pub(crate) fn instantiate(definition: &TaskDefinition) -> Result<BoxedSequence, String> {
    panic::catch_unwind(AssertUnwindSafe(|| definition.instantiate()))
        .map_err(|_| format!("factory for '{}' panicked", definition.key()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "step panicked".to_string()
    }
}
