// SPDX-FileCopyrightText: 2026 Sendq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./sendq.toml` > `~/.config/sendq/sendq.toml` >
//! `/etc/sendq/sendq.toml` with environment variable overrides via the
//! `SENDQ_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::SendqConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/sendq/sendq.toml` (system-wide)
/// 3. `~/.config/sendq/sendq.toml` (user XDG config)
/// 4. `./sendq.toml` (local directory)
/// 5. `SENDQ_*` environment variables
pub fn load_config() -> Result<SendqConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SendqConfig::default()))
        .merge(Toml::file("/etc/sendq/sendq.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("sendq/sendq.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("sendq.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string over compiled defaults only.
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<SendqConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SendqConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<SendqConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SendqConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `SENDQ_QUEUE_MAX_RETRIES` must map to
/// `queue.max_retries`, not `queue.max.retries`.
fn env_provider() -> Env {
    Env::prefixed("SENDQ_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("queue_", "queue.", 1)
            .replacen("storage_", "storage.", 1);
        mapped.into()
    })
}
