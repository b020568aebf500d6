// SPDX-FileCopyrightText: 2026 Sendq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the sendq bulk SMS engine.

use thiserror::Error;

/// The primary error type used across the sendq adapter traits and engine.
#[derive(Debug, Error)]
pub enum SendqError {
    /// Configuration errors (invalid TOML, bad values, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Sender adapter errors outside the normal carrier-failure path
    /// (broken native bridge, adapter process failure).
    #[error("sender error: {message}")]
    Sender {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The platform refused to send at all (missing SMS permission,
    /// misconfigured subscription). Not retryable; aborts the batch.
    #[error("send permission denied: {0}")]
    PermissionDenied(String),

    /// A batch run is already active on this queue manager.
    #[error("a send session is already active on this queue manager")]
    ActiveSession,

    /// Requested session does not exist in the session store.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
