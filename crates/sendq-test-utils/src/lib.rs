// SPDX-FileCopyrightText: 2026 Sendq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared test doubles for the sendq crates.
//!
//! `MockSender` scripts dispatch outcomes for deterministic engine tests,
//! and the in-memory store/tracker keep integration tests off the disk.

pub mod memory_store;
pub mod mock_sender;

pub use memory_store::{MemoryCampaignTracker, MemorySessionStore};
pub use mock_sender::{MockSender, ScriptedSend};
