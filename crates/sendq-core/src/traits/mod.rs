// SPDX-FileCopyrightText: 2026 Sendq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter traits at the engine's external seams.

pub mod campaign;
pub mod sender;
pub mod store;

pub use campaign::CampaignTracker;
pub use sender::SenderAdapter;
pub use store::SessionStore;
