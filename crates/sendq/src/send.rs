// SPDX-FileCopyrightText: 2026 Sendq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `send` subcommand: queue a CSV batch and drive it to completion.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use tracing::info;

use sendq_config::ConfigStore;
use sendq_core::{Priority, SenderAdapter, SendqError};
use sendq_engine::{QueueManager, SessionHandle};
use sendq_storage::{SqliteCampaignTracker, SqliteSessionStore};

use crate::recipients::{self, Defaults};
use crate::senders::{CommandSender, DryRunSender};

#[derive(Args, Debug)]
pub struct SendArgs {
    /// CSV file with a `recipient` column and optional `body`, `priority`,
    /// `campaign_id`, `variant_id` columns.
    #[arg(long, value_name = "FILE")]
    pub recipients: PathBuf,

    /// Message body for rows without their own.
    #[arg(long)]
    pub message: Option<String>,

    /// Priority for rows without their own.
    #[arg(long, default_value = "normal")]
    pub priority: Priority,

    /// Campaign label for rows without their own.
    #[arg(long)]
    pub campaign: Option<String>,

    #[command(flatten)]
    pub gateway: GatewayArgs,
}

/// How messages leave the process. Exactly one of the two must be chosen.
#[derive(Args, Debug)]
pub struct GatewayArgs {
    /// Shell command run once per message; the recipient arrives as `$1`,
    /// the body as `$2`.
    #[arg(long, value_name = "CMD", conflicts_with = "dry_run")]
    pub gateway_cmd: Option<String>,

    /// Log messages instead of dispatching them.
    #[arg(long)]
    pub dry_run: bool,
}

impl GatewayArgs {
    pub fn build_sender(&self) -> Result<Arc<dyn SenderAdapter>, SendqError> {
        if self.dry_run {
            Ok(Arc::new(DryRunSender))
        } else if let Some(cmd) = &self.gateway_cmd {
            Ok(Arc::new(CommandSender::new(cmd.clone())))
        } else {
            Err(SendqError::Config(
                "either --gateway-cmd or --dry-run is required".to_string(),
            ))
        }
    }
}

pub async fn run(
    args: SendArgs,
    config: Arc<ConfigStore>,
    store: Arc<SqliteSessionStore>,
    tracker: Arc<SqliteCampaignTracker>,
) -> Result<(), SendqError> {
    let sender = args.gateway.build_sender()?;
    let defaults = Defaults {
        body: args.message,
        priority: args.priority,
        campaign: args.campaign,
    };
    let items = recipients::load_recipients(&args.recipients, &defaults)?;
    info!(items = items.len(), "batch loaded");

    let manager = QueueManager::new(config, sender, store, tracker);
    let handle = manager.start(items).await?;
    println!("session {}", handle.id());
    drive(&handle).await
}

/// Await the send loop, stopping it cleanly on Ctrl-C, then report.
pub async fn drive(handle: &SessionHandle) -> Result<(), SendqError> {
    let waiter = handle.wait();
    tokio::pin!(waiter);
    let result = tokio::select! {
        res = &mut waiter => res,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, stopping after the in-flight message");
            handle.stop();
            waiter.await
        }
    };

    let snap = handle.counters();
    println!(
        "sent {}  failed {}  remaining {}  delivered {}",
        snap.sent, snap.failed, snap.queued, snap.delivered
    );
    if handle.is_degraded() {
        eprintln!("warning: session persistence was degraded during this run");
    }
    result
}
