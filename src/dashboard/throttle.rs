//! Call coalescing
//!
//! A [`Throttle`] decides when a rate-limited action runs. Callers report
//! each request with [`Throttle::call`] and run the action when it returns
//! `true`; requests that land inside the window are collapsed into one
//! trailing run, which the caller performs once [`Throttle::poll`] reports
//! it due. The throttle holds no timer itself, so the owner decides how to
//! wait for [`Throttle::deadline`].

use std::time::{Duration, Instant};

/// Rate limiter allowing at most one run per window
#[derive(Debug, Clone)]
pub struct Throttle {
    window: Duration,
    leading: bool,
    window_end: Option<Instant>,
    pending: bool,
}

impl Throttle {
    /// Run the first request of a quiet period immediately and coalesce the
    /// rest of the window into one trailing run.
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            leading: true,
            window_end: None,
            pending: false,
        }
    }

    /// Only ever run on the trailing edge of a window.
    #[must_use]
    pub const fn trailing_only(window: Duration) -> Self {
        Self {
            window,
            leading: false,
            window_end: None,
            pending: false,
        }
    }

    /// Register a request. Returns `true` if the action should run now.
    pub fn call(&mut self, now: Instant) -> bool {
        match self.window_end {
            Some(end) if now < end => {
                self.pending = true;
                false
            }
            Some(_) if self.pending => {
                // The trailing run was never polled; this request replaces it
                self.fire(now);
                true
            }
            _ => {
                self.window_end = Some(now + self.window);
                if self.leading {
                    true
                } else {
                    self.pending = true;
                    false
                }
            }
        }
    }

    /// When the coalesced trailing run is due, if one is waiting.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        if self.pending {
            self.window_end
        } else {
            None
        }
    }

    /// Returns `true` if the trailing run is due at `now`, and consumes it.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline() {
            Some(due) if now >= due => {
                self.fire(now);
                true
            }
            _ => false,
        }
    }

    fn fire(&mut self, now: Instant) {
        self.pending = false;
        self.window_end = Some(now + self.window);
    }
}
