//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::{Duration, Instant};
use tickflow::{steps, Signal};

/// Install a test subscriber once; respects `RUST_LOG`.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Poll `condition` every 5ms until it holds.
///
/// # Panics
///
/// Panics if `timeout` elapses first.
pub fn wait_until(timeout: Duration, what: &str, mut condition: impl FnMut() -> bool) {
    let start = Instant::now();
    while !condition() {
        if start.elapsed() > timeout {
            panic!("timed out after {:?} waiting for {}", timeout, what);
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}

/// Shared counter of how many times a step body ran.
#[derive(Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Ordered log of labels written by step bodies.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// A sequence that bumps `counter` on every resumption and always continues.
pub fn forever(counter: Counter) -> impl Iterator<Item = Signal> + Send {
    std::iter::repeat_with(move || {
        counter.bump();
        Signal::Continue
    })
}

/// A sequence that bumps `counter` and then waits `period`, forever.
pub fn every(counter: Counter, period: Duration) -> impl Iterator<Item = Signal> + Send {
    steps::from_fn(counter, move |counter| {
        counter.bump();
        Some(Signal::Wait(period))
    })
}
