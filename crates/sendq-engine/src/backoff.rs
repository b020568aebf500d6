// SPDX-FileCopyrightText: 2026 Sendq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capped exponential retry backoff.

use std::time::Duration;

/// Delay before retry number `attempt` (zero-based), doubling from
/// `base_ms` and capped at `cap_ms`.
///
/// `attempt = 0` waits `base_ms`, `attempt = 1` waits `2 * base_ms`, and
/// so on. The shift saturates, so large attempt counts land on the cap
/// instead of wrapping.
pub fn delay_for(attempt: u32, base_ms: u64, cap_ms: u64) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(factor).min(cap_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_from_base_until_cap() {
        assert_eq!(delay_for(0, 2000, 30000), Duration::from_millis(2000));
        assert_eq!(delay_for(1, 2000, 30000), Duration::from_millis(4000));
        assert_eq!(delay_for(2, 2000, 30000), Duration::from_millis(8000));
        assert_eq!(delay_for(3, 2000, 30000), Duration::from_millis(16000));
        assert_eq!(delay_for(4, 2000, 30000), Duration::from_millis(30000));
        assert_eq!(delay_for(10, 2000, 30000), Duration::from_millis(30000));
    }

    #[test]
    fn huge_attempt_counts_saturate_at_cap() {
        assert_eq!(delay_for(63, 2000, 30000), Duration::from_millis(30000));
        assert_eq!(delay_for(200, 2000, 30000), Duration::from_millis(30000));
    }

    #[test]
    fn zero_base_stays_zero() {
        assert_eq!(delay_for(5, 0, 30000), Duration::ZERO);
    }
}
