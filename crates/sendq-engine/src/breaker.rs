// SPDX-FileCopyrightText: 2026 Sendq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Circuit breaker over consecutive dispatch failures.
//!
//! The breaker counts consecutive failures across items within a running
//! session. At the configured threshold it opens; while open the send loop
//! waits instead of dispatching. After the cooldown elapses the breaker
//! closes automatically and the failure count resets. Any successful
//! dispatch also resets the count.

use std::time::Duration;

use tokio::time::Instant;

/// Gate decision for the next dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerCheck {
    /// Closed; dispatch may proceed.
    Ready,
    /// Open; wait at least `remaining` before checking again.
    Open { remaining: Duration },
}

/// Consecutive-failure circuit breaker with time-based auto-close.
///
/// Uses `tokio::time::Instant` so tests can drive the cooldown with a
/// paused clock.
#[derive(Debug, Default)]
pub struct CircuitBreaker {
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the breaker is currently open (before cooldown accounting).
    pub fn is_open(&self) -> bool {
        self.opened_at.is_some()
    }

    /// Current consecutive failure count.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Gate the next dispatch. An open breaker whose cooldown has elapsed
    /// closes here, with the failure count reset.
    pub fn check(&mut self, cooldown: Duration) -> BreakerCheck {
        match self.opened_at {
            None => BreakerCheck::Ready,
            Some(opened_at) => {
                let elapsed = opened_at.elapsed();
                if elapsed >= cooldown {
                    self.opened_at = None;
                    self.consecutive_failures = 0;
                    BreakerCheck::Ready
                } else {
                    BreakerCheck::Open {
                        remaining: cooldown - elapsed,
                    }
                }
            }
        }
    }

    /// Record a successful dispatch, resetting the failure streak.
    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    /// Record a failed dispatch. Returns `true` if this failure opened
    /// the breaker.
    pub fn record_failure(&mut self, threshold: u32) -> bool {
        self.consecutive_failures += 1;
        if self.consecutive_failures >= threshold && self.opened_at.is_none() {
            self.opened_at = Some(Instant::now());
            return true;
        }
        false
    }
}
