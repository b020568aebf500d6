// SPDX-FileCopyrightText: 2026 Sendq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sender adapter trait wrapping the native per-message send primitive.

use async_trait::async_trait;

use crate::error::SendqError;
use crate::types::DispatchOutcome;

/// Adapter over the platform's single-message SMS send primitive.
///
/// The primitive is assumed non-reentrant per subscription/SIM: the engine
/// never has more than one `send` in flight per session. Implementations
/// must be callable repeatedly and must report ordinary carrier failures
/// (no signal, rejected, permission) through [`DispatchOutcome::Failed`],
/// not through `Err`. An `Err` return is treated by the engine as a
/// generic, retryable failure.
#[async_trait]
pub trait SenderAdapter: Send + Sync {
    /// Attempt one SMS dispatch to `recipient` with the rendered `body`.
    async fn send(&self, recipient: &str, body: &str) -> Result<DispatchOutcome, SendqError>;
}
