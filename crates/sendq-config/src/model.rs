// SPDX-FileCopyrightText: 2026 Sendq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the sendq bulk SMS engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

use sendq_core::Priority;

/// Top-level sendq configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to documented values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SendqConfig {
    /// Send loop tunables: pacing, retries, circuit breaker.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Send loop tunables.
///
/// Runtime-mutable through [`crate::ConfigStore`]; the send loop re-reads
/// the effective config at the top of every iteration, so an update takes
/// effect on the very next message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Baseline delay between messages in milliseconds.
    #[serde(default = "default_delay_between_messages_ms")]
    pub delay_between_messages_ms: u64,

    /// Maximum dispatch attempts per item before it is exhausted.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base retry backoff delay in milliseconds (doubled per attempt).
    #[serde(default = "default_base_retry_delay_ms")]
    pub base_retry_delay_ms: u64,

    /// Hard cap on the retry backoff delay in milliseconds.
    #[serde(default = "default_max_backoff_delay_ms")]
    pub max_backoff_delay_ms: u64,

    /// Consecutive failures that trip the circuit breaker open.
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,

    /// Cooldown in milliseconds before an open breaker auto-closes.
    #[serde(default = "default_circuit_breaker_cooldown_ms")]
    pub circuit_breaker_cooldown_ms: u64,

    /// Per-priority inter-message delay overrides.
    #[serde(default)]
    pub priority_delays: PriorityDelays,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            delay_between_messages_ms: default_delay_between_messages_ms(),
            max_retries: default_max_retries(),
            base_retry_delay_ms: default_base_retry_delay_ms(),
            max_backoff_delay_ms: default_max_backoff_delay_ms(),
            max_consecutive_failures: default_max_consecutive_failures(),
            circuit_breaker_cooldown_ms: default_circuit_breaker_cooldown_ms(),
            priority_delays: PriorityDelays::default(),
        }
    }
}

impl QueueConfig {
    /// Shallow-merge the provided fields of `patch` into this config,
    /// including nested priority delays. Absent fields are left untouched.
    pub fn apply(&mut self, patch: &QueueConfigPatch) {
        if let Some(v) = patch.delay_between_messages_ms {
            self.delay_between_messages_ms = v;
        }
        if let Some(v) = patch.max_retries {
            self.max_retries = v;
        }
        if let Some(v) = patch.base_retry_delay_ms {
            self.base_retry_delay_ms = v;
        }
        if let Some(v) = patch.max_backoff_delay_ms {
            self.max_backoff_delay_ms = v;
        }
        if let Some(v) = patch.max_consecutive_failures {
            self.max_consecutive_failures = v;
        }
        if let Some(v) = patch.circuit_breaker_cooldown_ms {
            self.circuit_breaker_cooldown_ms = v;
        }
        if let Some(ref p) = patch.priority_delays {
            if let Some(v) = p.normal {
                self.priority_delays.normal = v;
            }
            if let Some(v) = p.high {
                self.priority_delays.high = v;
            }
            if let Some(v) = p.urgent {
                self.priority_delays.urgent = v;
            }
        }
    }
}

fn default_delay_between_messages_ms() -> u64 {
    1000
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_retry_delay_ms() -> u64 {
    2000
}

fn default_max_backoff_delay_ms() -> u64 {
    30_000
}

fn default_max_consecutive_failures() -> u32 {
    5
}

fn default_circuit_breaker_cooldown_ms() -> u64 {
    60_000
}

/// Per-priority inter-message delays in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PriorityDelays {
    #[serde(default = "default_priority_delay_normal")]
    pub normal: u64,

    #[serde(default = "default_priority_delay_high")]
    pub high: u64,

    #[serde(default = "default_priority_delay_urgent")]
    pub urgent: u64,
}

impl Default for PriorityDelays {
    fn default() -> Self {
        Self {
            normal: default_priority_delay_normal(),
            high: default_priority_delay_high(),
            urgent: default_priority_delay_urgent(),
        }
    }
}

impl PriorityDelays {
    /// Delay in milliseconds for the given priority tier.
    pub fn for_priority(&self, priority: Priority) -> u64 {
        match priority {
            Priority::Normal => self.normal,
            Priority::High => self.high,
            Priority::Urgent => self.urgent,
        }
    }
}

fn default_priority_delay_normal() -> u64 {
    1000
}

fn default_priority_delay_high() -> u64 {
    500
}

fn default_priority_delay_urgent() -> u64 {
    100
}

/// Partial update overlay for [`QueueConfig`].
///
/// Every field is optional; only provided fields are merged. Nested
/// priority delays merge field-by-field as well.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfigPatch {
    #[serde(default)]
    pub delay_between_messages_ms: Option<u64>,
    #[serde(default)]
    pub max_retries: Option<u32>,
    #[serde(default)]
    pub base_retry_delay_ms: Option<u64>,
    #[serde(default)]
    pub max_backoff_delay_ms: Option<u64>,
    #[serde(default)]
    pub max_consecutive_failures: Option<u32>,
    #[serde(default)]
    pub circuit_breaker_cooldown_ms: Option<u64>,
    #[serde(default)]
    pub priority_delays: Option<PriorityDelaysPatch>,
}

/// Partial update overlay for [`PriorityDelays`].
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PriorityDelaysPatch {
    #[serde(default)]
    pub normal: Option<u64>,
    #[serde(default)]
    pub high: Option<u64>,
    #[serde(default)]
    pub urgent: Option<u64>,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("sendq").join("sendq.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("sendq.db"))
        .to_string_lossy()
        .into_owned()
}
