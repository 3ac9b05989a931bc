mod builder;
mod handle;
mod host;
mod instance;
mod lanes;
mod scheduler;
mod shared;

pub use builder::SchedulerBuilder;
pub use host::{HostLoop, ManualHost, UpdateCallback};
pub use scheduler::Scheduler;
