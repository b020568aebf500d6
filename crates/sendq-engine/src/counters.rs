// SPDX-FileCopyrightText: 2026 Sendq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lock-free live counters for a running session.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Live counters updated by the send loop and readable from any thread.
///
/// `sent` and `failed` count terminal outcomes (`failed` means retries
/// exhausted). `queued` is the number of items not yet terminal.
/// `delivered` is fed externally from carrier delivery reports and lags
/// `sent`.
#[derive(Debug, Default)]
pub struct LiveCounters {
    sent: AtomicU64,
    failed: AtomicU64,
    queued: AtomicU64,
    delivered: AtomicU64,
}

impl LiveCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_queued(&self, queued: u64) {
        self.queued.store(queued, Ordering::Relaxed);
    }

    /// Consistent-enough point-in-time view for display.
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            sent: self.sent.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time counter values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub sent: u64,
    pub failed: u64,
    pub queued: u64,
    pub delivered: u64,
}
