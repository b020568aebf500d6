// SPDX-FileCopyrightText: 2026 Sendq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the sendq workspace.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Priority tier of a queue item.
///
/// Priority selects the inter-message delay applied after dispatching the
/// item. It never reorders the queue: items are sent strictly in list order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Normal,
    High,
    Urgent,
}

/// Lifecycle status of a single queue item.
///
/// Valid transitions: `Pending -> Sending`, then `Sending -> Sent`,
/// `Sending -> Pending` (requeued for retry), or `Sending -> Exhausted`
/// (retry cap reached). `Sent` and `Exhausted` are terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Sending,
    Sent,
    Failed,
    Exhausted,
}

impl ItemStatus {
    /// Whether this status is terminal (the item will never be attempted again).
    pub fn is_terminal(self) -> bool {
        matches!(self, ItemStatus::Sent | ItemStatus::Exhausted)
    }

    /// Whether the item counts toward the live `queued` counter.
    pub fn is_queued(self) -> bool {
        matches!(self, ItemStatus::Pending | ItemStatus::Sending)
    }

    /// Whether `self -> next` is a legal status transition.
    pub fn can_transition_to(self, next: ItemStatus) -> bool {
        use ItemStatus::*;
        matches!(
            (self, next),
            (Pending, Sending) | (Sending, Sent) | (Sending, Pending) | (Sending, Failed)
                | (Sending, Exhausted) | (Failed, Pending)
        )
    }
}

/// One recipient's pending or attempted send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    /// Phone number, caller-normalized before it enters the queue.
    pub recipient: String,
    /// Final rendered message text.
    pub body: String,
    pub priority: Priority,
    /// Number of failed dispatch attempts so far.
    pub attempt_count: u32,
    pub status: ItemStatus,
    pub campaign_id: Option<String>,
    /// Optional A/B test variant label within the campaign.
    pub variant_id: Option<String>,
    /// Last failure reason, if any.
    pub last_error: Option<String>,
}

impl QueueItem {
    /// Create a fresh pending item.
    pub fn new(recipient: impl Into<String>, body: impl Into<String>, priority: Priority) -> Self {
        Self {
            recipient: recipient.into(),
            body: body.into(),
            priority,
            attempt_count: 0,
            status: ItemStatus::Pending,
            campaign_id: None,
            variant_id: None,
            last_error: None,
        }
    }

    /// Attach a campaign (and optional variant) label.
    pub fn with_campaign(mut self, campaign_id: impl Into<String>, variant_id: Option<String>) -> Self {
        self.campaign_id = Some(campaign_id.into());
        self.variant_id = variant_id;
        self
    }
}

/// Persisted snapshot of one batch run.
///
/// Insertion order of `items` is send order. `cursor` is the index of the
/// next item to attempt and is monotonically non-decreasing for the life of
/// the session; resuming restarts the loop at `cursor` and never re-sends
/// items already marked `Sent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    /// RFC3339 creation timestamp.
    pub created_at: String,
    pub items: Vec<QueueItem>,
    pub cursor: usize,
    pub paused: bool,
    /// Effective inter-message delay baseline at session start, in ms.
    pub send_speed_ms: u64,
}

impl Session {
    /// Create a new session with a generated id over the given items.
    pub fn new(items: Vec<QueueItem>, send_speed_ms: u64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            items,
            cursor: 0,
            paused: false,
            send_speed_ms,
        }
    }

    /// All items have reached a terminal status.
    pub fn is_complete(&self) -> bool {
        self.items.iter().all(|i| i.status.is_terminal())
    }

    /// Count of items with the given status.
    pub fn count_with_status(&self, status: ItemStatus) -> usize {
        self.items.iter().filter(|i| i.status == status).count()
    }

    /// Count of items still pending or in flight.
    pub fn queued_count(&self) -> usize {
        self.items.iter().filter(|i| i.status.is_queued()).count()
    }
}

/// Carrier-level failure codes reported by the sender adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DispatchErrorCode {
    /// No cell signal / radio unavailable.
    NoSignal,
    /// Carrier or gateway rejected the message.
    Rejected,
    /// Gateway asked us to slow down.
    RateLimited,
    /// SMS permission missing or revoked. Not retryable.
    PermissionDenied,
    /// Unclassified failure.
    Generic,
}

impl DispatchErrorCode {
    /// Whether a failure with this code should be retried with backoff.
    pub fn is_retryable(self) -> bool {
        !matches!(self, DispatchErrorCode::PermissionDenied)
    }
}

/// Result of one native dispatch attempt.
///
/// Ordinary carrier-level failures are reported as `Failed`, never as an
/// `Err` from the adapter; `Err` is reserved for unexpected adapter faults
/// and is classified by the engine as a generic failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Accepted,
    Failed {
        code: DispatchErrorCode,
        details: Option<String>,
    },
}

/// Terminal per-recipient outcome recorded against a campaign.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CampaignOutcome {
    Sent,
    Failed,
}

/// Per-variant aggregate counts within a campaign.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantStats {
    pub sent: u64,
    pub failed: u64,
}

/// Aggregated outcome counts for one campaign. Derived from recorded
/// outcomes, not primary storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignStats {
    pub sent: u64,
    pub failed: u64,
    /// Counts keyed by variant id, for items that carried one.
    pub per_variant: BTreeMap<String, VariantStats>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn priority_round_trips_through_strings() {
        for p in [Priority::Normal, Priority::High, Priority::Urgent] {
            let s = p.to_string();
            assert_eq!(Priority::from_str(&s).unwrap(), p);
        }
        assert_eq!(Priority::Urgent.to_string(), "urgent");
    }

    #[test]
    fn item_status_round_trips_through_strings() {
        for s in [
            ItemStatus::Pending,
            ItemStatus::Sending,
            ItemStatus::Sent,
            ItemStatus::Failed,
            ItemStatus::Exhausted,
        ] {
            assert_eq!(ItemStatus::from_str(&s.to_string()).unwrap(), s);
        }
    }

    #[test]
    fn sent_is_terminal_and_never_transitions() {
        assert!(ItemStatus::Sent.is_terminal());
        for next in [
            ItemStatus::Pending,
            ItemStatus::Sending,
            ItemStatus::Sent,
            ItemStatus::Failed,
            ItemStatus::Exhausted,
        ] {
            assert!(!ItemStatus::Sent.can_transition_to(next));
        }
    }

    #[test]
    fn legal_transition_table() {
        assert!(ItemStatus::Pending.can_transition_to(ItemStatus::Sending));
        assert!(ItemStatus::Sending.can_transition_to(ItemStatus::Sent));
        assert!(ItemStatus::Sending.can_transition_to(ItemStatus::Pending));
        assert!(ItemStatus::Sending.can_transition_to(ItemStatus::Exhausted));
        assert!(ItemStatus::Failed.can_transition_to(ItemStatus::Pending));
        assert!(!ItemStatus::Pending.can_transition_to(ItemStatus::Sent));
        assert!(!ItemStatus::Exhausted.can_transition_to(ItemStatus::Pending));
    }

    #[test]
    fn queued_counts_pending_and_sending_only() {
        assert!(ItemStatus::Pending.is_queued());
        assert!(ItemStatus::Sending.is_queued());
        assert!(!ItemStatus::Sent.is_queued());
        assert!(!ItemStatus::Exhausted.is_queued());
    }

    #[test]
    fn new_session_starts_at_cursor_zero_unpaused() {
        let items = vec![QueueItem::new("+15550100", "hello", Priority::Normal)];
        let session = Session::new(items, 1000);
        assert_eq!(session.cursor, 0);
        assert!(!session.paused);
        assert_eq!(session.send_speed_ms, 1000);
        assert!(!session.is_complete());
        assert_eq!(session.queued_count(), 1);
    }

    #[test]
    fn session_complete_when_all_terminal() {
        let mut session = Session::new(
            vec![
                QueueItem::new("+15550100", "a", Priority::Normal),
                QueueItem::new("+15550101", "b", Priority::Normal),
            ],
            1000,
        );
        session.items[0].status = ItemStatus::Sent;
        session.items[1].status = ItemStatus::Exhausted;
        assert!(session.is_complete());
        assert_eq!(session.queued_count(), 0);
        assert_eq!(session.count_with_status(ItemStatus::Exhausted), 1);
    }

    #[test]
    fn permission_denied_is_not_retryable() {
        assert!(!DispatchErrorCode::PermissionDenied.is_retryable());
        assert!(DispatchErrorCode::NoSignal.is_retryable());
        assert!(DispatchErrorCode::Rejected.is_retryable());
        assert!(DispatchErrorCode::RateLimited.is_retryable());
        assert!(DispatchErrorCode::Generic.is_retryable());
    }

    #[test]
    fn queue_item_with_campaign_labels() {
        let item = QueueItem::new("+15550100", "offer", Priority::High)
            .with_campaign("spring-sale", Some("b".to_string()));
        assert_eq!(item.campaign_id.as_deref(), Some("spring-sale"));
        assert_eq!(item.variant_id.as_deref(), Some("b"));
        assert_eq!(item.attempt_count, 0);
        assert_eq!(item.status, ItemStatus::Pending);
    }

    #[test]
    fn dispatch_error_code_serializes_snake_case() {
        let json = serde_json::to_string(&DispatchErrorCode::NoSignal).unwrap();
        assert_eq!(json, "\"no_signal\"");
        let parsed: DispatchErrorCode = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, DispatchErrorCode::NoSignal);
    }
}
