use crate::resume::Outcome;
use crate::signal::Signal;
use crate::task::BoxedSequence;
use indexmap::IndexMap;
use std::time::Duration;

/// One active run of a task on a tick-driven lane.
pub(crate) struct RunningInstance {
    run_id: u64,
    /// `None` while the sequence is out being resumed
    sequence: Option<BoxedSequence>,
    last: Signal,
    /// Tick time accumulated since `last` was yielded
    elapsed: Duration,
}

/// What `process` should do with an instance this tick.
pub(crate) enum Poll {
    /// Resume this sequence, then hand it back through `settle`.
    Resume(BoxedSequence),
    /// Waiting for more tick time.
    Pending,
    /// The instance had yielded `End` and has been removed.
    Removed,
    /// Stopped, replaced, or currently being resumed elsewhere.
    Skip,
}

/// Result of handing a resumed sequence back.
#[derive(Debug, PartialEq)]
pub(crate) enum Settled {
    Kept,
    Removed,
    Failed(String),
    /// The instance was stopped while its sequence was out.
    Gone,
}

/// Running set of one tick-driven lane, in insertion order.
///
/// The tick and physics lanes each own one of these; both run the same
/// resume logic and differ only in who calls `process`.
pub(crate) struct RunSet {
    running: IndexMap<String, RunningInstance>,
}

impl RunSet {
    pub(crate) fn new() -> Self {
        Self {
            running: IndexMap::new(),
        }
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.running.contains_key(key)
    }

    /// Claim `key` for a new run whose first resumption is still to happen.
    /// Returns false if the key is already running on this lane.
    pub(crate) fn reserve(&mut self, key: &str, run_id: u64) -> bool {
        if self.running.contains_key(key) {
            return false;
        }
        self.running.insert(
            key.to_string(),
            RunningInstance {
                run_id,
                sequence: None,
                last: Signal::Continue,
                elapsed: Duration::ZERO,
            },
        );
        true
    }

    pub(crate) fn remove(&mut self, key: &str) -> bool {
        self.running.shift_remove(key).is_some()
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        self.running.keys().cloned().collect()
    }

    /// Stable view of the set for one `process` pass.
    pub(crate) fn snapshot(&self) -> Vec<(String, u64)> {
        self.running
            .iter()
            .map(|(key, instance)| (key.clone(), instance.run_id))
            .collect()
    }

    /// Account `delta` to the instance and decide whether it resumes now.
    pub(crate) fn poll(&mut self, key: &str, run_id: u64, delta: Duration) -> Poll {
        let Some(instance) = self.running.get_mut(key) else {
            return Poll::Skip;
        };
        if instance.run_id != run_id || instance.sequence.is_none() {
            return Poll::Skip;
        }

        let last = instance.last;
        match last {
            Signal::End => {
                self.running.shift_remove(key);
                Poll::Removed
            }
            Signal::Continue => instance.sequence.take().map_or(Poll::Skip, Poll::Resume),
            Signal::Wait(_) => {
                instance.elapsed = instance.elapsed.saturating_add(delta);
                if last.is_satisfied(instance.elapsed) {
                    instance.sequence.take().map_or(Poll::Skip, Poll::Resume)
                } else {
                    Poll::Pending
                }
            }
        }
    }

    /// Put a resumed sequence back according to what it yielded.
    ///
    /// On the first resumption of a run a finished sequence is kept with an
    /// `End` marker and removed on the next `process`; later resumptions
    /// remove it straight away.
    pub(crate) fn settle(
        &mut self,
        key: &str,
        run_id: u64,
        sequence: BoxedSequence,
        outcome: Outcome,
        first: bool,
    ) -> Settled {
        let Some(instance) = self.running.get_mut(key) else {
            return Settled::Gone;
        };
        if instance.run_id != run_id {
            return Settled::Gone;
        }

        match outcome {
            Outcome::Yielded(signal) => {
                instance.sequence = Some(sequence);
                instance.last = signal;
                instance.elapsed = Duration::ZERO;
                Settled::Kept
            }
            Outcome::Finished if first => {
                instance.sequence = Some(sequence);
                instance.last = Signal::End;
                instance.elapsed = Duration::ZERO;
                Settled::Kept
            }
            Outcome::Finished => {
                self.running.shift_remove(key);
                Settled::Removed
            }
            Outcome::Failed(message) => {
                self.running.shift_remove(key);
                Settled::Failed(message)
            }
        }
    }

    /// Drop every instance, returning the keys that were running.
    pub(crate) fn clear(&mut self) -> Vec<String> {
        self.running.drain(..).map(|(key, _)| key).collect()
    }
}
