// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Rate Limiter
//!
//! Local enforcement of the Strava request quotas: 100 requests per
//! rolling 15 minutes and 1000 per rolling 24 hours. A request is
//! admitted only when both windows have capacity, and admission
//! consumes a slot in both.
//!
//! `acquire` is an admission check, not a blocking wait: callers decide
//! whether to queue, retry later, or surface the condition.

use crate::clock::Clock;
use crate::constants::rate_limit as limits;
use crate::errors::{Result, StravaError};
use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// A rolling window of request timestamps with a fixed admission limit
#[derive(Debug)]
pub struct RateWindow {
    window: Duration,
    limit: usize,
    events: VecDeque<DateTime<Utc>>,
}

impl RateWindow {
    pub fn new(window: Duration, limit: usize) -> Self {
        Self {
            window,
            limit,
            events: VecDeque::new(),
        }
    }

    /// Drop events older than the window. Called lazily before each check.
    fn prune(&mut self, now: DateTime<Utc>) {
        let cutoff = now - self.window;
        while let Some(oldest) = self.events.front() {
            if *oldest <= cutoff {
                self.events.pop_front();
            } else {
                break;
            }
        }
    }

    fn has_capacity(&self) -> bool {
        self.events.len() < self.limit
    }

    fn record(&mut self, now: DateTime<Utc>) {
        self.events.push_back(now);
    }

    /// Time until the oldest event ages out and a slot reopens.
    /// Only meaningful when the window is at its limit.
    fn retry_after(&self, now: DateTime<Utc>) -> Duration {
        match self.events.front() {
            Some(oldest) => (*oldest + self.window) - now,
            None => Duration::zero(),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.events.len()
    }
}

struct Windows {
    short: RateWindow,
    daily: RateWindow,
}

/// Gate for all outbound Strava calls
///
/// The check-and-record step runs under a single mutex so concurrent
/// callers can never be admitted past a limit.
pub struct RateLimiter {
    clock: Arc<dyn Clock>,
    windows: Mutex<Windows>,
}

impl RateLimiter {
    /// Limiter configured with the Strava default quotas
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_windows(
            clock,
            RateWindow::new(
                Duration::seconds(limits::SHORT_WINDOW_SECS),
                limits::SHORT_WINDOW_LIMIT,
            ),
            RateWindow::new(
                Duration::seconds(limits::DAILY_WINDOW_SECS),
                limits::DAILY_WINDOW_LIMIT,
            ),
        )
    }

    /// Limiter with caller-supplied windows
    pub fn with_windows(clock: Arc<dyn Clock>, short: RateWindow, daily: RateWindow) -> Self {
        Self {
            clock,
            windows: Mutex::new(Windows { short, daily }),
        }
    }

    /// Admit one request or fail with a retry hint
    ///
    /// Prunes both windows, checks both limits, and records the request
    /// in both windows as a single atomic operation.
    pub fn acquire(&self) -> Result<()> {
        let now = self.clock.now();
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());

        windows.short.prune(now);
        windows.daily.prune(now);

        if windows.short.has_capacity() && windows.daily.has_capacity() {
            windows.short.record(now);
            windows.daily.record(now);
            return Ok(());
        }

        // Report the longer wait when both windows are exhausted
        let mut wait = Duration::zero();
        if !windows.short.has_capacity() {
            wait = wait.max(windows.short.retry_after(now));
        }
        if !windows.daily.has_capacity() {
            wait = wait.max(windows.daily.retry_after(now));
        }

        debug!("local rate limit reached, retry after {}s", wait.num_seconds());
        Err(StravaError::RateLimited {
            retry_after: wait.to_std().ok(),
        })
    }
}
