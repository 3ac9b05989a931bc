use std::time::Duration;

/// Per-frame callback handed to a host.
pub type UpdateCallback = Box<dyn FnMut(Duration) + Send>;

/// Adapter seam to the host's update loop.
///
/// Implement this for whatever owns the frame and fixed-step callbacks, then
/// pass it to [`Scheduler::attach`](crate::Scheduler::attach). The host must
/// call each callback with the time elapsed since its previous call.
pub trait HostLoop {
    fn on_process(&mut self, callback: UpdateCallback);

    fn on_physics_process(&mut self, callback: UpdateCallback);
}

/// A minimal host for loops that own their callbacks directly.
#[derive(Default)]
pub struct ManualHost {
    process: Vec<UpdateCallback>,
    physics: Vec<UpdateCallback>,
}

impl ManualHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every frame callback with `delta`.
    pub fn frame(&mut self, delta: Duration) {
        for callback in &mut self.process {
            callback(delta);
        }
    }

    /// Run every fixed-step callback with `delta`.
    pub fn fixed_step(&mut self, delta: Duration) {
        for callback in &mut self.physics {
            callback(delta);
        }
    }
}

impl HostLoop for ManualHost {
    fn on_process(&mut self, callback: UpdateCallback) {
        self.process.push(callback);
    }

    fn on_physics_process(&mut self, callback: UpdateCallback) {
        self.physics.push(callback);
    }
}
