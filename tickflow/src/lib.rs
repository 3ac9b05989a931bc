//! # Tickflow - Tick-driven coroutines for step-based host loops
//!
//! Long-lived, stateful procedures run in small slices: each resumption runs
//! until the procedure yields a [`Signal`], and the scheduler resumes it on
//! the next tick, after a delay, or never again.
//!
//! ## Features
//!
//! - **Tick lane**: resumed from the host's per-frame update
//! - **Physics lane**: the same resume logic on the fixed-step update
//! - **Thread lane**: a task runs to completion on its own OS thread
//! - **Task lane**: a task runs to completion on a tokio pool
//! - **Single flight**: at most one run per key per lane
//! - **Cooperative cancellation**: `stop` and `shutdown` signal lanes and wait for them
//! - **Config support**: lane settings and `enabled` flags from TOML/YAML files
//!
//! ## Quick Start
//!
//! ```rust
//! use tickflow::{steps, SchedulerBuilder, Signal};
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let scheduler = SchedulerBuilder::new()
//!     .register("countdown", || {
//!         // three beats, one second apart
//!         (0..3).map(|_| Signal::wait_secs(1.0))
//!     })
//!     .build()?;
//!
//! scheduler.start_if_not_running("countdown")?;
//!
//! // inside the host's update callback
//! scheduler.tick(Duration::from_millis(16));
//! assert!(scheduler.is_running("countdown"));
//!
//! scheduler.shutdown();
//! # Ok(())
//! # }
//! ```
//!
//! ## Auto-registered coroutines
//!
//! ```rust,ignore
//! use tickflow::{routine, SchedulerBuilder, Signal};
//!
//! #[routine(key = "autosave", enabled = "${app.autosave:true}")]
//! fn autosave() -> impl Iterator<Item = Signal> + Send {
//!     std::iter::repeat_with(|| {
//!         save_game();
//!         Signal::wait_secs(60.0)
//!     })
//! }
//!
//! let scheduler = SchedulerBuilder::with_toml("config/application.toml")?
//!     .register_all()
//!     .build()?;
//! scheduler.start_on_thread("autosave")?;
//! ```
//!
//! ## Configuration
//!
//! Create `config/application.toml`:
//!
//! ```toml
//! [scheduler]
//! thread_name_prefix = "game-lane"
//! task_worker_threads = 4
//!
//! [app]
//! autosave = false
//! ```
//!
//! You can also use environment variables with `APP_` prefix:
//!
//! ```bash
//! export APP_APP_AUTOSAVE=true
//! ```

// Re-export macros
pub use tickflow_macro::routine;

// Re-export core types
pub use tickflow_runtime::{
    steps, HostLoop, Lane, ManualHost, Result, Scheduler, SchedulerBuilder, SchedulerConfig,
    SchedulerError, Signal, StepFailure, StepSequence, TaskDefinition, UpdateCallback,
};

// Make tickflow_runtime available for macro expansion
pub use tickflow_runtime;
