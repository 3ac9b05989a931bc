use std::fmt;

/// Execution context a running instance lives on.
///
/// A key may be active on several lanes at once, but on each lane at most
/// one instance exists per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lane {
    /// Driven by `Scheduler::tick` on the host's regular update.
    Tick,
    /// Driven by `Scheduler::physics_tick` on the host's fixed-step update.
    Physics,
    /// Runs to completion on a dedicated OS thread.
    Thread,
    /// Runs to completion as a task on the async pool.
    Task,
}

impl Lane {
    pub const ALL: [Lane; 4] = [Lane::Tick, Lane::Physics, Lane::Thread, Lane::Task];

    /// Tick-driven lanes are resumed by the host; the others drive themselves.
    pub fn is_tick_driven(&self) -> bool {
        matches!(self, Lane::Tick | Lane::Physics)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Lane::Tick => "tick",
            Lane::Physics => "physics",
            Lane::Thread => "thread",
            Lane::Task => "task",
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
