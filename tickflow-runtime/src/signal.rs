use std::time::Duration;

/// Value yielded by a step sequence to control its own resumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Resume on the next drive of the lane (next tick, or immediately on a thread/task lane).
    Continue,
    /// Resume once the given amount of time has passed since the signal was yielded.
    Wait(Duration),
    /// Never resume again.
    End,
}

impl Signal {
    /// Build a `Wait` from fractional seconds, the unit most host loops report.
    ///
    /// Negative and NaN inputs clamp to zero.
    pub fn wait_secs(seconds: f64) -> Self {
        let duration = Duration::try_from_secs_f64(seconds).unwrap_or(if seconds > 0.0 {
            Duration::MAX
        } else {
            Duration::ZERO
        });
        Signal::Wait(duration)
    }

    /// Build a `Wait` from whole milliseconds.
    pub fn wait_millis(millis: u64) -> Self {
        Signal::Wait(Duration::from_millis(millis))
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Signal::End)
    }

    /// Whether a tick lane that has accumulated `elapsed` since this signal
    /// was yielded may resume the sequence.
    ///
    /// Positive waits are satisfied once `elapsed` strictly exceeds the
    /// requested duration; a zero wait behaves like `Continue`.
    pub(crate) fn is_satisfied(&self, elapsed: Duration) -> bool {
        match self {
            Signal::Continue => true,
            Signal::Wait(duration) => duration.is_zero() || elapsed > *duration,
            Signal::End => false,
        }
    }
}
