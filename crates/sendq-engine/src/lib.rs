// SPDX-FileCopyrightText: 2026 Sendq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The sendq send engine.
//!
//! One [`QueueManager`] owns the rate-limited, one-at-a-time send loop:
//! priority-aware pacing between messages, capped exponential backoff for
//! retries, a circuit breaker over consecutive failures, write-through
//! session persistence, and live counters. At most one session runs per
//! manager; batches survive crashes via [`QueueManager::resume`].

pub mod backoff;
pub mod breaker;
pub mod counters;
pub mod manager;

pub use breaker::{BreakerCheck, CircuitBreaker};
pub use counters::{CounterSnapshot, LiveCounters};
pub use manager::{QueueManager, SessionHandle};
