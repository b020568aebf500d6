// SPDX-FileCopyrightText: 2026 Sendq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `stats` subcommand: aggregate campaign outcomes.

use sendq_core::{CampaignTracker, SendqError};

pub async fn show(tracker: &dyn CampaignTracker, campaign_id: &str) -> Result<(), SendqError> {
    let stats = tracker.get_stats(campaign_id).await?;
    let total = stats.sent + stats.failed;
    if total == 0 {
        println!("no recorded outcomes for campaign {campaign_id}");
        return Ok(());
    }

    println!("campaign {campaign_id}");
    println!("  sent   {:>8}", stats.sent);
    println!("  failed {:>8}", stats.failed);
    if !stats.per_variant.is_empty() {
        println!("  variants:");
        for (variant, v) in &stats.per_variant {
            let variant_total = v.sent + v.failed;
            let rate = if variant_total > 0 {
                v.sent as f64 / variant_total as f64 * 100.0
            } else {
                0.0
            };
            println!(
                "    {variant:<12} sent {:>6}  failed {:>6}  ({rate:.1}% delivered to carrier)",
                v.sent, v.failed
            );
        }
    }
    Ok(())
}
