// SPDX-FileCopyrightText: 2026 Sendq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory `SessionStore` and `CampaignTracker` implementations.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use sendq_core::{
    CampaignOutcome, CampaignStats, CampaignTracker, SendqError, Session, SessionStore,
    VariantStats,
};

/// Session store over a plain `HashMap`, with an optional fault switch
/// for exercising degraded-persistence paths.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Arc<Mutex<HashMap<String, Session>>>,
    fail_saves: AtomicBool,
    save_count: AtomicU64,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `save` fail until switched back.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of `save` calls attempted, including failed ones.
    pub fn save_count(&self) -> u64 {
        self.save_count.load(Ordering::SeqCst)
    }

    /// Direct snapshot access for assertions.
    pub async fn get(&self, id: &str) -> Option<Session> {
        self.sessions.lock().await.get(id).cloned()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn save(&self, session: &Session) -> Result<(), SendqError> {
        self.save_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(SendqError::Storage {
                source: Box::new(std::io::Error::other("simulated save failure")),
            });
        }
        self.sessions
            .lock()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Option<Session>, SendqError> {
        Ok(self.sessions.lock().await.get(id).cloned())
    }

    async fn list_incomplete(&self) -> Result<Vec<Session>, SendqError> {
        let sessions = self.sessions.lock().await;
        let mut incomplete: Vec<Session> = sessions
            .values()
            .filter(|s| !s.is_complete())
            .cloned()
            .collect();
        incomplete.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(incomplete)
    }

    async fn delete(&self, id: &str) -> Result<(), SendqError> {
        self.sessions.lock().await.remove(id);
        Ok(())
    }
}

/// Campaign tracker that keeps every recorded outcome in a `Vec`.
#[derive(Default)]
pub struct MemoryCampaignTracker {
    outcomes: Arc<Mutex<Vec<(String, Option<String>, CampaignOutcome)>>>,
}

impl MemoryCampaignTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded outcomes, in recording order.
    pub async fn recorded(&self) -> Vec<(String, Option<String>, CampaignOutcome)> {
        self.outcomes.lock().await.clone()
    }
}

#[async_trait]
impl CampaignTracker for MemoryCampaignTracker {
    async fn record_outcome(
        &self,
        campaign_id: &str,
        variant_id: Option<&str>,
        outcome: CampaignOutcome,
    ) -> Result<(), SendqError> {
        self.outcomes.lock().await.push((
            campaign_id.to_string(),
            variant_id.map(|s| s.to_string()),
            outcome,
        ));
        Ok(())
    }

    async fn get_stats(&self, campaign_id: &str) -> Result<CampaignStats, SendqError> {
        let outcomes = self.outcomes.lock().await;
        let mut stats = CampaignStats::default();
        for (campaign, variant, outcome) in outcomes.iter() {
            if campaign != campaign_id {
                continue;
            }
            match outcome {
                CampaignOutcome::Sent => stats.sent += 1,
                CampaignOutcome::Failed => stats.failed += 1,
            }
            if let Some(variant) = variant {
                let entry = stats
                    .per_variant
                    .entry(variant.clone())
                    .or_insert_with(VariantStats::default);
                match outcome {
                    CampaignOutcome::Sent => entry.sent += 1,
                    CampaignOutcome::Failed => entry.failed += 1,
                }
            }
        }
        Ok(stats)
    }
}
