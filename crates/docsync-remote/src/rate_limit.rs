//! Request budget tracking and pacing
//!
//! The remote API grants a quota of requests per time window. The
//! [`RateLimiter`] keeps a pessimistic local copy of that budget and turns it
//! into a per-request wait target, so that a burst of requests is spread
//! evenly across what is left of the window instead of exhausting the quota
//! up front.
//!
//! ## Budget model
//!
//! - The server-reported remaining count is multiplied by a speedup factor
//!   (default 8) when recorded. Over-estimating only costs an extra quota
//!   query once the local budget runs out.
//! - Every paced request decrements the budget, floored at zero.
//! - A budget of zero forces the caller to query the true quota again.
//!
//! One limiter is created per process and shared by every client through an
//! `Arc<RateLimiter>`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use docsync_remote::rate_limit::RateLimiter;
//!
//! let limiter = Arc::new(RateLimiter::with_defaults());
//! limiter.set_remaining(60);
//! let wait = limiter.wait_duration();
//! limiter.decrement();
//! ```

use std::{
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use chrono::{DateTime, Utc};
use docsync_core::config::RateLimitingConfig;
use tracing::debug;

/// Default multiplier applied to the server-reported remaining quota
pub const DEFAULT_SPEEDUP_FACTOR: u32 = 8;

/// Window length assumed before the first quota query
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(3600);

/// Mutable budget state, protected by a Mutex.
#[derive(Debug)]
struct BudgetState {
    /// Requests the limiter still allows in this window
    remaining: u32,
    /// When the budget was last refreshed from the server
    window_start: DateTime<Utc>,
    /// Server-reported end of the true quota window
    window_end: DateTime<Utc>,
}

/// Process-wide request budget shared by all remote clients
///
/// The state starts with a zero budget so that the first paced request
/// queries the true quota.
#[derive(Debug)]
pub struct RateLimiter {
    speedup_factor: u32,
    state: Mutex<BudgetState>,
}

impl RateLimiter {
    /// Creates a limiter with the given speedup factor and assumed window.
    ///
    /// A speedup factor of zero is treated as one.
    pub fn new(speedup_factor: u32, window: Duration) -> Self {
        let now = Utc::now();
        let window =
            chrono::Duration::from_std(window).unwrap_or_else(|_| chrono::Duration::hours(1));
        Self {
            speedup_factor: speedup_factor.max(1),
            state: Mutex::new(BudgetState {
                remaining: 0,
                window_start: now,
                window_end: now + window,
            }),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_SPEEDUP_FACTOR, DEFAULT_WINDOW)
    }

    pub fn from_config(config: &RateLimitingConfig) -> Self {
        Self::new(
            config.speedup_factor,
            Duration::from_secs(config.window_secs),
        )
    }

    fn state(&self) -> MutexGuard<'_, BudgetState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn speedup_factor(&self) -> u32 {
        self.speedup_factor
    }

    /// Current pessimistic budget
    pub fn remaining(&self) -> u32 {
        self.state().remaining
    }

    /// Records a fresh server-reported remaining count.
    pub fn set_remaining(&self, remaining: u32) {
        self.set_remaining_at(remaining, Utc::now());
    }

    /// [`Self::set_remaining`] with an explicit clock reading
    pub fn set_remaining_at(&self, remaining: u32, now: DateTime<Utc>) {
        let mut state = self.state();
        state.remaining = remaining.saturating_mul(self.speedup_factor);
        state.window_start = now;
        debug!(
            reported = remaining,
            budget = state.remaining,
            "Request budget refreshed"
        );
    }

    /// Consumes one request from the budget. Never goes below zero.
    pub fn decrement(&self) {
        let mut state = self.state();
        state.remaining = state.remaining.saturating_sub(1);
    }

    /// Server-reported end of the true quota window
    pub fn reset_date(&self) -> DateTime<Utc> {
        self.state().window_end
    }

    pub fn set_reset_date(&self, reset: DateTime<Utc>) {
        self.state().window_end = reset;
    }

    /// When the budget was last refreshed
    pub fn window_start(&self) -> DateTime<Utc> {
        self.state().window_start
    }

    /// The time the next request may be issued.
    pub fn internal_reset_date(&self) -> DateTime<Utc> {
        self.internal_reset_date_at(Utc::now())
    }

    /// Computes the wait target relative to `now`.
    ///
    /// - If the true window has already ended, `now` (no wait).
    /// - If the budget is exhausted, the true window end.
    /// - Otherwise the time left in the window divided evenly across the
    ///   remaining budget.
    pub fn internal_reset_date_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let state = self.state();
        if now >= state.window_end {
            return now;
        }
        if state.remaining < 1 {
            return state.window_end;
        }
        let left = state.window_end - now;
        let step =
            chrono::Duration::milliseconds(left.num_milliseconds() / i64::from(state.remaining));
        now + step
    }

    /// How long the next request must wait, zero if it may go now.
    pub fn wait_duration(&self) -> Duration {
        let now = Utc::now();
        (self.internal_reset_date_at(now) - now)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::with_defaults()
    }
}
