// SPDX-FileCopyrightText: 2026 Sendq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! CSV recipient list loading.
//!
//! Expected header: `recipient` plus any of `body`, `priority`,
//! `campaign_id`, `variant_id`. Per-row values win over the command-line
//! defaults.

use std::path::Path;

use serde::Deserialize;

use sendq_core::{Priority, QueueItem, SendqError};

#[derive(Debug, Deserialize)]
struct Row {
    recipient: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    priority: Option<Priority>,
    #[serde(default)]
    campaign_id: Option<String>,
    #[serde(default)]
    variant_id: Option<String>,
}

/// Command-line fallbacks for columns a row leaves empty.
pub struct Defaults {
    pub body: Option<String>,
    pub priority: Priority,
    pub campaign: Option<String>,
}

pub fn load_recipients(path: &Path, defaults: &Defaults) -> Result<Vec<QueueItem>, SendqError> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| SendqError::Config(format!("cannot read {}: {e}", path.display())))?;

    let mut items = Vec::new();
    for (index, row) in reader.deserialize::<Row>().enumerate() {
        let line = index + 2; // 1-based, after the header
        let row = row
            .map_err(|e| SendqError::Config(format!("{} line {line}: {e}", path.display())))?;
        if row.recipient.trim().is_empty() {
            return Err(SendqError::Config(format!(
                "{} line {line}: empty recipient",
                path.display()
            )));
        }
        let body = row
            .body
            .filter(|b| !b.is_empty())
            .or_else(|| defaults.body.clone())
            .ok_or_else(|| {
                SendqError::Config(format!(
                    "{} line {line}: no body column and no --message given",
                    path.display()
                ))
            })?;

        let mut item = QueueItem::new(
            row.recipient.trim().to_string(),
            body,
            row.priority.unwrap_or(defaults.priority),
        );
        item.campaign_id = row.campaign_id.or_else(|| defaults.campaign.clone());
        item.variant_id = row.variant_id;
        items.push(item);
    }
    Ok(items)
}
