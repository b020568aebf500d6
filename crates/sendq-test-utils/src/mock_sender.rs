// SPDX-FileCopyrightText: 2026 Sendq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock sender adapter for deterministic dispatch testing.
//!
//! `MockSender` implements `SenderAdapter` with a scripted queue of
//! outcomes, enabling fast, CI-runnable tests without a real gateway.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use sendq_core::{DispatchOutcome, SenderAdapter, SendqError};

/// One scripted reply from the mock gateway.
#[derive(Debug, Clone)]
pub enum ScriptedSend {
    /// The send call returns this outcome.
    Outcome(DispatchOutcome),
    /// The send call itself fails with a sender error.
    Error(String),
}

/// A mock sender that replays pre-configured outcomes.
///
/// Outcomes are popped from a FIFO script. When the script is empty,
/// the configured default outcome is returned (accepted unless changed).
/// Every dispatch is logged as a `(recipient, body)` pair.
pub struct MockSender {
    script: Arc<Mutex<VecDeque<ScriptedSend>>>,
    default: DispatchOutcome,
    dispatched: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockSender {
    /// Create a mock sender that accepts everything.
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            default: DispatchOutcome::Accepted,
            dispatched: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock sender pre-loaded with the given script.
    pub fn with_script(script: Vec<ScriptedSend>) -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::from(script))),
            default: DispatchOutcome::Accepted,
            dispatched: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Change the outcome returned once the script runs out.
    pub fn with_default(mut self, default: DispatchOutcome) -> Self {
        self.default = default;
        self
    }

    /// Append a scripted reply to the end of the queue.
    pub async fn push(&self, entry: ScriptedSend) {
        self.script.lock().await.push_back(entry);
    }

    /// All `(recipient, body)` pairs dispatched so far, in order.
    pub async fn dispatched(&self) -> Vec<(String, String)> {
        self.dispatched.lock().await.clone()
    }

    /// Number of dispatch attempts made so far.
    pub async fn dispatch_count(&self) -> usize {
        self.dispatched.lock().await.len()
    }
}

impl Default for MockSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SenderAdapter for MockSender {
    async fn send(&self, recipient: &str, body: &str) -> Result<DispatchOutcome, SendqError> {
        self.dispatched
            .lock()
            .await
            .push((recipient.to_string(), body.to_string()));
        match self.script.lock().await.pop_front() {
            Some(ScriptedSend::Outcome(outcome)) => Ok(outcome),
            Some(ScriptedSend::Error(message)) => Err(SendqError::Sender {
                message,
                source: None,
            }),
            None => Ok(self.default.clone()),
        }
    }
}
