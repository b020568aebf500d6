// SPDX-FileCopyrightText: 2026 Sendq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session management subcommands: list and resume.

use std::sync::Arc;

use clap::Args;

use sendq_config::ConfigStore;
use sendq_core::{ItemStatus, SendqError, SessionStore};
use sendq_engine::QueueManager;
use sendq_storage::{SqliteCampaignTracker, SqliteSessionStore};

use crate::send::{self, GatewayArgs};

#[derive(Args, Debug)]
pub struct ResumeArgs {
    pub session_id: String,

    #[command(flatten)]
    pub gateway: GatewayArgs,
}

pub async fn list(store: &dyn SessionStore) -> Result<(), SendqError> {
    let sessions = store.list_incomplete().await?;
    if sessions.is_empty() {
        println!("no resumable sessions");
        return Ok(());
    }
    println!(
        "{:<38} {:<27} {:>9} {:>9} {:>7}",
        "SESSION", "CREATED", "PROGRESS", "EXHAUSTED", "PAUSED"
    );
    for session in sessions {
        let sent = session.count_with_status(ItemStatus::Sent);
        let exhausted = session.count_with_status(ItemStatus::Exhausted);
        println!(
            "{:<38} {:<27} {:>4}/{:<4} {:>9} {:>7}",
            session.id,
            session.created_at,
            sent,
            session.items.len(),
            exhausted,
            if session.paused { "yes" } else { "no" },
        );
    }
    Ok(())
}

pub async fn resume(
    args: ResumeArgs,
    config: Arc<ConfigStore>,
    store: Arc<SqliteSessionStore>,
    tracker: Arc<SqliteCampaignTracker>,
) -> Result<(), SendqError> {
    let sender = args.gateway.build_sender()?;
    let manager = QueueManager::new(config, sender, store, tracker);
    let handle = manager.resume(&args.session_id).await?;
    send::drive(&handle).await
}
