// SPDX-FileCopyrightText: 2026 Sendq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign outcome tracker trait for aggregate reporting.

use async_trait::async_trait;

use crate::error::SendqError;
use crate::types::{CampaignOutcome, CampaignStats};

/// Records terminal per-recipient outcomes against a campaign and optional
/// A/B variant, and serves derived aggregates.
#[async_trait]
pub trait CampaignTracker: Send + Sync {
    /// Record one terminal outcome for the campaign (and variant, if any).
    async fn record_outcome(
        &self,
        campaign_id: &str,
        variant_id: Option<&str>,
        outcome: CampaignOutcome,
    ) -> Result<(), SendqError>;

    /// Aggregate counts for one campaign.
    async fn get_stats(&self, campaign_id: &str) -> Result<CampaignStats, SendqError>;
}
