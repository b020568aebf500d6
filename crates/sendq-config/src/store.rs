// SPDX-FileCopyrightText: 2026 Sendq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-wide runtime-mutable configuration holder.
//!
//! The send loop reads the effective [`QueueConfig`] at the top of every
//! iteration, so updates take effect on the very next message without any
//! caching layer. Backed by [`arc_swap::ArcSwap`] so reads are lock-free;
//! tests inject isolated instances instead of relying on ambient globals.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::model::{QueueConfig, QueueConfigPatch};

/// Shared, thread-safe holder for the effective queue configuration.
#[derive(Debug)]
pub struct ConfigStore {
    current: ArcSwap<QueueConfig>,
}

impl ConfigStore {
    /// Create a store seeded with the given initial configuration
    /// (typically the loaded file/env config).
    pub fn new(initial: QueueConfig) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
        }
    }

    /// Snapshot of the current effective configuration.
    ///
    /// The returned `Arc` is immutable; callers can never mutate the stored
    /// config through it.
    pub fn get(&self) -> Arc<QueueConfig> {
        self.current.load_full()
    }

    /// Shallow-merge the provided fields of `patch` into the current config
    /// and return the new effective configuration.
    pub fn update(&self, patch: &QueueConfigPatch) -> QueueConfig {
        self.current.rcu(|current| {
            let mut next = (**current).clone();
            next.apply(patch);
            Arc::new(next)
        });
        (*self.get()).clone()
    }

    /// Restore the compiled-in defaults and return them.
    pub fn reset(&self) -> QueueConfig {
        let defaults = QueueConfig::default();
        self.current.store(Arc::new(defaults.clone()));
        defaults
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(QueueConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PriorityDelaysPatch;

    #[test]
    fn update_merges_and_is_immediately_visible() {
        let store = ConfigStore::default();
        let effective = store.update(&QueueConfigPatch {
            max_retries: Some(5),
            ..Default::default()
        });
        assert_eq!(effective.max_retries, 5);
        assert_eq!(store.get().max_retries, 5);
        // Merge, not replace: untouched fields keep their values.
        assert_eq!(store.get().priority_delays.urgent, 100);
        assert_eq!(store.get().delay_between_messages_ms, 1000);
    }

    #[test]
    fn nested_priority_delay_update_keeps_siblings() {
        let store = ConfigStore::default();
        store.update(&QueueConfigPatch {
            priority_delays: Some(PriorityDelaysPatch {
                high: Some(200),
                ..Default::default()
            }),
            ..Default::default()
        });
        let config = store.get();
        assert_eq!(config.priority_delays.high, 200);
        assert_eq!(config.priority_delays.normal, 1000);
        assert_eq!(config.priority_delays.urgent, 100);
    }

    #[test]
    fn reset_restores_documented_defaults_exactly() {
        let store = ConfigStore::default();
        store.update(&QueueConfigPatch {
            max_retries: Some(9),
            circuit_breaker_cooldown_ms: Some(1),
            priority_delays: Some(PriorityDelaysPatch {
                normal: Some(1),
                high: Some(1),
                urgent: Some(1),
            }),
            ..Default::default()
        });
        let restored = store.reset();
        assert_eq!(restored, QueueConfig::default());
        assert_eq!(*store.get(), QueueConfig::default());
    }

    #[test]
    fn snapshot_is_isolated_from_later_updates() {
        let store = ConfigStore::default();
        let before = store.get();
        store.update(&QueueConfigPatch {
            max_retries: Some(7),
            ..Default::default()
        });
        assert_eq!(before.max_retries, 3);
        assert_eq!(store.get().max_retries, 7);
    }
}
