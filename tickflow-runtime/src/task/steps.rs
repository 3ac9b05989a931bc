//! Building blocks for step sequences that don't fit an iterator chain.

use crate::signal::Signal;
use std::collections::VecDeque;
use std::time::Duration;

/// A sequence driven by a closure over owned state.
///
/// Every resumption calls `step(&mut state)`; returning `None` finishes the
/// sequence. This is the explicit state-machine form of a coroutine body.
///
/// ```rust
/// use tickflow_runtime::{steps, Signal};
///
/// // count to three, one number per tick
/// let mut seq = steps::from_fn(0u32, |n| {
///     *n += 1;
///     (*n <= 3).then_some(Signal::Continue)
/// });
/// assert_eq!(seq.next(), Some(Signal::Continue));
/// ```
pub fn from_fn<S, F>(state: S, step: F) -> FromFn<S, F>
where
    S: Send,
    F: FnMut(&mut S) -> Option<Signal> + Send,
{
    FromFn { state, step }
}

/// Sequence returned by [`from_fn`].
pub struct FromFn<S, F> {
    state: S,
    step: F,
}

impl<S, F> Iterator for FromFn<S, F>
where
    F: FnMut(&mut S) -> Option<Signal>,
{
    type Item = Signal;

    fn next(&mut self) -> Option<Signal> {
        (self.step)(&mut self.state)
    }
}

enum Stage {
    Run(Box<dyn FnMut() + Send>),
    Yield(Signal),
}

/// A linear script of actions separated by suspension points.
///
/// Actions queued between two signals run together in one resumption.
///
/// ```rust
/// use tickflow_runtime::steps;
/// use std::time::Duration;
///
/// let script = steps::script()
///     .run(|| println!("spawn wave"))
///     .wait(Duration::from_secs(1))
///     .run(|| println!("spawn boss"))
///     .end();
/// # drop(script);
/// ```
pub fn script() -> Script {
    Script {
        stages: VecDeque::new(),
    }
}

/// Sequence returned by [`script`].
pub struct Script {
    stages: VecDeque<Stage>,
}

impl Script {
    /// Queue an action.
    pub fn run<F>(mut self, action: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.stages.push_back(Stage::Run(Box::new(action)));
        self
    }

    /// Queue an arbitrary signal.
    pub fn then(mut self, signal: Signal) -> Self {
        self.stages.push_back(Stage::Yield(signal));
        self
    }

    /// Suspend until the next drive.
    pub fn next_tick(self) -> Self {
        self.then(Signal::Continue)
    }

    pub fn wait(self, duration: Duration) -> Self {
        self.then(Signal::Wait(duration))
    }

    /// Terminate explicitly; stages queued after this never run.
    pub fn end(self) -> Self {
        self.then(Signal::End)
    }
}

impl Iterator for Script {
    type Item = Signal;

    fn next(&mut self) -> Option<Signal> {
        while let Some(stage) = self.stages.pop_front() {
            match stage {
                Stage::Run(mut action) => action(),
                Stage::Yield(signal) => {
                    if signal.is_end() {
                        self.stages.clear();
                    }
                    return Some(signal);
                }
            }
        }
        None
    }
}
