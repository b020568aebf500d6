// SPDX-FileCopyrightText: 2026 Sendq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait adapters exposing the SQLite layer through the core seams.

use async_trait::async_trait;

use sendq_core::{
    CampaignOutcome, CampaignStats, CampaignTracker, SendqError, Session, SessionStore,
};

use crate::database::Database;
use crate::queries;

/// [`SessionStore`] backed by the sendq SQLite database.
#[derive(Clone)]
pub struct SqliteSessionStore {
    db: Database,
}

impl SqliteSessionStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn save(&self, session: &Session) -> Result<(), SendqError> {
        queries::sessions::save_session(&self.db, session).await
    }

    async fn load(&self, id: &str) -> Result<Option<Session>, SendqError> {
        queries::sessions::load_session(&self.db, id).await
    }

    async fn list_incomplete(&self) -> Result<Vec<Session>, SendqError> {
        queries::sessions::list_incomplete_sessions(&self.db).await
    }

    async fn delete(&self, id: &str) -> Result<(), SendqError> {
        queries::sessions::delete_session(&self.db, id).await
    }
}

/// [`CampaignTracker`] backed by the sendq SQLite database.
#[derive(Clone)]
pub struct SqliteCampaignTracker {
    db: Database,
}

impl SqliteCampaignTracker {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CampaignTracker for SqliteCampaignTracker {
    async fn record_outcome(
        &self,
        campaign_id: &str,
        variant_id: Option<&str>,
        outcome: CampaignOutcome,
    ) -> Result<(), SendqError> {
        queries::campaigns::record_outcome(&self.db, campaign_id, variant_id, outcome).await
    }

    async fn get_stats(&self, campaign_id: &str) -> Result<CampaignStats, SendqError> {
        queries::campaigns::get_stats(&self.db, campaign_id).await
    }
}
