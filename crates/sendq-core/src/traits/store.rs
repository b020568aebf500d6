// SPDX-FileCopyrightText: 2026 Sendq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session store trait: the durable source of truth for resumability.

use async_trait::async_trait;

use crate::error::SendqError;
use crate::types::Session;

/// Durable storage for in-progress and paused batch runs.
///
/// The engine writes through after every item outcome so that a crash
/// re-sends at most one message per session. The in-memory loop state is a
/// cache over this store; resumption reconstructs the cursor entirely from
/// a reload.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist the full session snapshot, replacing any previous one.
    async fn save(&self, session: &Session) -> Result<(), SendqError>;

    /// Load a session by id. Returns `None` if it does not exist.
    async fn load(&self, id: &str) -> Result<Option<Session>, SendqError>;

    /// List sessions that still have non-terminal items, oldest first.
    async fn list_incomplete(&self) -> Result<Vec<Session>, SendqError>;

    /// Delete a session and its items.
    async fn delete(&self, id: &str) -> Result<(), SendqError>;
}
