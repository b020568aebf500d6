// SPDX-FileCopyrightText: 2026 Sendq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sender adapters available to the CLI: a logging dry-run sender and a
//! per-message gateway command runner.

use async_trait::async_trait;
use tracing::info;

use sendq_core::{DispatchErrorCode, DispatchOutcome, SenderAdapter, SendqError};

/// Logs each message instead of dispatching it. Every send is accepted.
pub struct DryRunSender;

#[async_trait]
impl SenderAdapter for DryRunSender {
    async fn send(&self, recipient: &str, body: &str) -> Result<DispatchOutcome, SendqError> {
        info!(recipient, body_len = body.len(), "dry-run dispatch");
        Ok(DispatchOutcome::Accepted)
    }
}

/// Runs a shell command once per message, passing the recipient as `$1`
/// and the body as `$2`.
///
/// Exit status maps to an outcome via sysexits conventions:
/// `0` accepted, `75` (EX_TEMPFAIL) rate limited, `77` (EX_NOPERM)
/// permission denied, anything else a generic failure. Trailing stderr
/// output becomes the failure detail.
pub struct CommandSender {
    program: String,
}

impl CommandSender {
    pub fn new(program: String) -> Self {
        Self { program }
    }
}

#[async_trait]
impl SenderAdapter for CommandSender {
    async fn send(&self, recipient: &str, body: &str) -> Result<DispatchOutcome, SendqError> {
        let output = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&self.program)
            .arg("sendq-gateway")
            .arg(recipient)
            .arg(body)
            .output()
            .await
            .map_err(|e| SendqError::Sender {
                message: "failed to spawn gateway command".to_string(),
                source: Some(Box::new(e)),
            })?;

        if output.status.success() {
            return Ok(DispatchOutcome::Accepted);
        }
        let code = match output.status.code() {
            Some(75) => DispatchErrorCode::RateLimited,
            Some(77) => DispatchErrorCode::PermissionDenied,
            _ => DispatchErrorCode::Generic,
        };
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Ok(DispatchOutcome::Failed {
            code,
            details: (!stderr.is_empty()).then_some(stderr),
        })
    }
}
