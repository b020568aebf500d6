// SPDX-FileCopyrightText: 2026 Sendq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the sendq bulk SMS engine.
//!
//! This crate provides the domain types, the error type, and the adapter
//! traits at the engine's external seams: the native send primitive, the
//! durable session store, and the campaign outcome tracker. The engine
//! itself lives in `sendq-engine`; SQLite-backed adapters in `sendq-storage`.

pub mod error;
pub mod traits;
pub mod types;

pub use error::SendqError;
pub use types::{
    CampaignOutcome, CampaignStats, DispatchErrorCode, DispatchOutcome, ItemStatus, Priority,
    QueueItem, Session, VariantStats,
};

pub use traits::{CampaignTracker, SenderAdapter, SessionStore};
