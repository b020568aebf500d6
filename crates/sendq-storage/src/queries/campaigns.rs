// SPDX-FileCopyrightText: 2026 Sendq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign outcome recording and derived aggregate stats.

use rusqlite::params;
use sendq_core::{CampaignOutcome, CampaignStats, SendqError, VariantStats};

use crate::database::Database;

/// Record one terminal per-recipient outcome for a campaign.
pub async fn record_outcome(
    db: &Database,
    campaign_id: &str,
    variant_id: Option<&str>,
    outcome: CampaignOutcome,
) -> Result<(), SendqError> {
    let campaign_id = campaign_id.to_string();
    let variant_id = variant_id.map(|s| s.to_string());
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO campaign_outcomes (campaign_id, variant_id, outcome)
                 VALUES (?1, ?2, ?3)",
                params![campaign_id, variant_id, outcome.to_string()],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Aggregate sent/failed counts for a campaign, overall and per variant.
///
/// Derived from the recorded outcomes with a GROUP BY; nothing is stored
/// pre-aggregated. Outcomes without a variant count toward the totals only.
pub async fn get_stats(db: &Database, campaign_id: &str) -> Result<CampaignStats, SendqError> {
    let campaign_id = campaign_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT variant_id,
                        SUM(CASE WHEN outcome = 'sent' THEN 1 ELSE 0 END),
                        SUM(CASE WHEN outcome = 'failed' THEN 1 ELSE 0 END)
                 FROM campaign_outcomes
                 WHERE campaign_id = ?1
                 GROUP BY variant_id",
            )?;
            let rows = stmt.query_map(params![campaign_id], |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?;

            let mut stats = CampaignStats::default();
            for row in rows {
                let (variant, sent, failed) = row?;
                stats.sent += sent as u64;
                stats.failed += failed as u64;
                if let Some(variant) = variant {
                    stats.per_variant.insert(
                        variant,
                        VariantStats {
                            sent: sent as u64,
                            failed: failed as u64,
                        },
                    );
                }
            }
            Ok(stats)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
