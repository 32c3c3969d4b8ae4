// src/clock.rs
//! Time source and retry budgeting.
//!
//! The host frame loop never blocks on us, so "waiting" for content is just
//! counting failed attempts. [`RetryBudget`] bounds an episode of failures by
//! attempt count and, optionally, by elapsed time on an injected [`Clock`].

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::config::HideGeometryConfig;

pub trait Clock {
    /// Monotonic time since an arbitrary epoch.
    fn now(&self) -> Duration;
}

/// Wall clock backed by `Instant`.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self { start: Instant::now() }
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Hand-driven clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn set(&self, to: Duration) {
        self.now.set(to);
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// Bounds one episode of consecutive registration failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryBudget {
    max_retries: u32,
    window: Option<Duration>,
    started_at: Option<Duration>,
}

impl RetryBudget {
    pub fn new(config: &HideGeometryConfig) -> Self {
        Self {
            max_retries: config.max_retries.max(1),
            window: config.retry_window,
            started_at: None,
        }
    }

    /// Records a failure at `now`; `retries` counts failures so far in the
    /// episode, this one included. Returns true once the budget is spent.
    pub fn exhausted(&mut self, retries: u32, now: Duration) -> bool {
        let started = *self.started_at.get_or_insert(now);
        if retries >= self.max_retries {
            return true;
        }
        match self.window {
            Some(window) => now.saturating_sub(started) >= window,
            None => false,
        }
    }

    pub fn in_episode(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn reset(&mut self) {
        self.started_at = None;
    }
}
