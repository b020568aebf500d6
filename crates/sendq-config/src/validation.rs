// SPDX-FileCopyrightText: 2026 Sendq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes. Field types are unsigned, so negative delays and counts are
//! unrepresentable; the checks here reject the zero values that would make
//! the engine misbehave (a retry cap of zero exhausts every item instantly,
//! a zero breaker threshold trips on the first failure).

use crate::diagnostic::ConfigError;
use crate::model::SendqConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &SendqConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.queue.max_retries == 0 {
        errors.push(ConfigError::Validation {
            message: "queue.max_retries must be at least 1".to_string(),
        });
    }

    if config.queue.max_consecutive_failures == 0 {
        errors.push(ConfigError::Validation {
            message: "queue.max_consecutive_failures must be at least 1".to_string(),
        });
    }

    if config.queue.circuit_breaker_cooldown_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "queue.circuit_breaker_cooldown_ms must be at least 1".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
