mod definition;
pub mod steps;

pub use definition::TaskDefinition;

use crate::signal::Signal;

/// A resumable procedure.
///
/// Each call to `resume` runs the procedure up to its next suspension point
/// and reports how it wants to be resumed. `None` means the procedure has
/// finished and has the same effect as yielding [`Signal::End`].
///
/// Any `Iterator<Item = Signal> + Send` is a step sequence, so generators
/// written with iterator adaptors work out of the box. For procedures with
/// owned state, see [`steps::from_fn`].
pub trait StepSequence: Send {
    fn resume(&mut self) -> Option<Signal>;
}

impl<I> StepSequence for I
where
    I: Iterator<Item = Signal> + Send,
{
    fn resume(&mut self) -> Option<Signal> {
        self.next()
    }
}

/// Boxed sequence as stored by running instances.
pub type BoxedSequence = Box<dyn StepSequence>;
