// SPDX-FileCopyrightText: 2026 Sendq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! sendq - rate-limited bulk SMS send engine.
//!
//! This is the binary entry point for the sendq CLI.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sendq_config::{ConfigStore, SendqConfig};
use sendq_core::SendqError;
use sendq_engine::QueueManager;
use sendq_storage::{Database, SqliteCampaignTracker, SqliteSessionStore};

mod recipients;
mod send;
mod senders;
mod sessions;
mod stats;

/// sendq - rate-limited bulk SMS send engine.
#[derive(Parser, Debug)]
#[command(name = "sendq", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Queue a batch of messages from a CSV file and send it.
    Send(send::SendArgs),
    /// List persisted sessions with undelivered work.
    Sessions,
    /// Resume a persisted session from where it left off.
    Resume(sessions::ResumeArgs),
    /// Delete a persisted session, abandoning its remaining items.
    Discard {
        session_id: String,
    },
    /// Drop exhausted items from a session so the rest can be resumed.
    ClearExhausted {
        session_id: String,
    },
    /// Show aggregate outcomes for a campaign, overall and per variant.
    Stats {
        campaign_id: String,
    },
    /// Print the effective configuration as TOML.
    Config,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = match sendq_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            sendq_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let cli = Cli::parse();
    if let Err(e) = run(cli, config).await {
        eprintln!("sendq: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: SendqConfig) -> Result<(), SendqError> {
    if let Commands::Config = cli.command {
        let rendered = toml::to_string_pretty(&config)
            .map_err(|e| SendqError::Internal(format!("cannot render config: {e}")))?;
        print!("{rendered}");
        return Ok(());
    }

    let db = Database::open(&config.storage.database_path).await?;
    let store = Arc::new(SqliteSessionStore::new(db.clone()));
    let tracker = Arc::new(SqliteCampaignTracker::new(db.clone()));
    let config_store = Arc::new(ConfigStore::new(config.queue.clone()));

    match cli.command {
        Commands::Send(args) => send::run(args, config_store, store, tracker).await,
        Commands::Sessions => sessions::list(store.as_ref()).await,
        Commands::Resume(args) => sessions::resume(args, config_store, store, tracker).await,
        Commands::Discard { session_id } => {
            let manager = QueueManager::new(
                config_store,
                Arc::new(senders::DryRunSender),
                store,
                tracker,
            );
            manager.discard(&session_id).await?;
            println!("discarded session {session_id}");
            Ok(())
        }
        Commands::ClearExhausted { session_id } => {
            let manager = QueueManager::new(
                config_store,
                Arc::new(senders::DryRunSender),
                store,
                tracker,
            );
            let removed = manager.clear_exhausted(&session_id).await?;
            println!("removed {removed} exhausted item(s) from session {session_id}");
            Ok(())
        }
        Commands::Stats { campaign_id } => stats::show(tracker.as_ref(), &campaign_id).await,
        Commands::Config => unreachable!("handled above"),
    }
}
