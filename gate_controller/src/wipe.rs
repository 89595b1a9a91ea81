//! Wipe confirmation window.
//!
//! A held wipe control arms the wipe. It executes only if the control is
//! still held once the full window has elapsed; releasing it at any poll
//! cancels immediately.

use gate_common::hal::config::TimingConfig;
use gate_common::hal::driver::{Clock, WipeControl};
use std::time::Duration;
use tracing::{debug, info};

/// Outcome of the confirmation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WipeDecision {
    /// Control held for the whole window.
    Confirmed,
    /// Control released before the deadline.
    Cancelled,
}

/// Deadline plus polling predicate.
#[derive(Debug, Clone, Copy)]
pub struct WipeGuard {
    /// Confirmation window length.
    window: Duration,
    /// Interval between polls of the control.
    poll: Duration,
}

impl WipeGuard {
    /// Create a guard with explicit window and poll interval.
    pub const fn new(window: Duration, poll: Duration) -> Self {
        Self { window, poll }
    }

    /// Guard configured from `[timing]`.
    pub fn from_timing(timing: &TimingConfig) -> Self {
        Self::new(timing.wipe_confirm(), timing.wipe_poll())
    }

    /// Confirmation window length.
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Run the window.
    ///
    /// Blocks on `clock` for at most the window length.
    pub fn confirm(&self, control: &mut dyn WipeControl, clock: &mut dyn Clock) -> WipeDecision {
        let deadline = clock.now() + self.window;
        info!(
            "Wipe armed, hold for {} ms to confirm",
            self.window.as_millis()
        );

        loop {
            let now = clock.now();
            if now >= deadline {
                break;
            }
            if !control.is_held() {
                info!("Wipe control released, wipe cancelled");
                return WipeDecision::Cancelled;
            }
            let remaining = deadline - now;
            debug!("Wipe confirms in {} ms", remaining.as_millis());
            clock.sleep(self.poll.min(remaining));
        }

        if control.is_held() {
            WipeDecision::Confirmed
        } else {
            info!("Wipe control released at deadline, wipe cancelled");
            WipeDecision::Cancelled
        }
    }
}
