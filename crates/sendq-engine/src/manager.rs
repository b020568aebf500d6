// SPDX-FileCopyrightText: 2026 Sendq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The queue manager and its single-session send loop.
//!
//! [`QueueManager`] starts or resumes one batch at a time and hands back a
//! [`SessionHandle`] for live control (pause, resume, stop, counters). The
//! loop sends strictly one message at a time, paces between messages by
//! item priority, retries failures in place with capped exponential
//! backoff, and persists the full session snapshot after every state
//! change so a crash re-sends at most one message.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use sendq_config::{ConfigStore, QueueConfig};
use sendq_core::{
    CampaignOutcome, CampaignStats, CampaignTracker, DispatchOutcome, ItemStatus, QueueItem,
    SenderAdapter, SendqError, Session, SessionStore,
};

use crate::backoff;
use crate::breaker::{BreakerCheck, CircuitBreaker};
use crate::counters::{CounterSnapshot, LiveCounters};

/// Orchestrates batch sends over the sender, store, and tracker seams.
///
/// The circuit breaker is owned here, not by the session, so failure
/// streaks carry across consecutive batches against the same gateway.
pub struct QueueManager {
    config: Arc<ConfigStore>,
    sender: Arc<dyn SenderAdapter>,
    store: Arc<dyn SessionStore>,
    campaigns: Arc<dyn CampaignTracker>,
    breaker: Arc<Mutex<CircuitBreaker>>,
    active: Arc<AtomicBool>,
}

impl QueueManager {
    pub fn new(
        config: Arc<ConfigStore>,
        sender: Arc<dyn SenderAdapter>,
        store: Arc<dyn SessionStore>,
        campaigns: Arc<dyn CampaignTracker>,
    ) -> Self {
        Self {
            config,
            sender,
            store,
            campaigns,
            breaker: Arc::new(Mutex::new(CircuitBreaker::new())),
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start a new batch over `items`.
    ///
    /// The initial snapshot must persist before the loop spawns; an
    /// unrecorded batch cannot be resumed after a crash. Fails with
    /// [`SendqError::ActiveSession`] if a batch is already running.
    pub async fn start(&self, items: Vec<QueueItem>) -> Result<SessionHandle, SendqError> {
        let guard = self.acquire()?;
        let cfg = self.config.get();
        let session = Session::new(items, cfg.delay_between_messages_ms);
        self.store.save(&session).await?;
        info!(
            session_id = %session.id,
            items = session.items.len(),
            "send session started"
        );
        Ok(self.spawn(session, guard))
    }

    /// Resume a persisted session from its cursor.
    ///
    /// Items stuck in `Sending` from a crash mid-dispatch are reset to
    /// `Pending`, so a resume re-sends at most one message per crash.
    pub async fn resume(&self, id: &str) -> Result<SessionHandle, SendqError> {
        let guard = self.acquire()?;
        let mut session = self
            .store
            .load(id)
            .await?
            .ok_or_else(|| SendqError::SessionNotFound(id.to_string()))?;
        for item in &mut session.items {
            // Sending means a crash mid-dispatch; Failed means a crash
            // during the backoff wait. Both pick up again as pending.
            if matches!(item.status, ItemStatus::Sending | ItemStatus::Failed) {
                item.status = ItemStatus::Pending;
            }
        }
        session.paused = false;
        self.store.save(&session).await?;
        info!(
            session_id = %session.id,
            cursor = session.cursor,
            remaining = session.items.len().saturating_sub(session.cursor),
            "send session resumed"
        );
        Ok(self.spawn(session, guard))
    }

    /// Sessions that still have undelivered work, oldest first.
    pub async fn list_resumable(&self) -> Result<Vec<Session>, SendqError> {
        self.store.list_incomplete().await
    }

    /// Delete a persisted session, abandoning its remaining items.
    pub async fn discard(&self, id: &str) -> Result<(), SendqError> {
        if self.active.load(Ordering::SeqCst) {
            return Err(SendqError::ActiveSession);
        }
        if self.store.load(id).await?.is_none() {
            return Err(SendqError::SessionNotFound(id.to_string()));
        }
        self.store.delete(id).await
    }

    /// Remove exhausted items from a stored session so the rest can run.
    ///
    /// The cursor shifts down by the number of removed items that sat
    /// before it, keeping it on the same next item. A session left with
    /// only sent items (or nothing) is deleted. Returns the removed count.
    pub async fn clear_exhausted(&self, id: &str) -> Result<u64, SendqError> {
        if self.active.load(Ordering::SeqCst) {
            return Err(SendqError::ActiveSession);
        }
        let mut session = self
            .store
            .load(id)
            .await?
            .ok_or_else(|| SendqError::SessionNotFound(id.to_string()))?;

        let removed_before_cursor = session
            .items
            .iter()
            .take(session.cursor)
            .filter(|i| i.status == ItemStatus::Exhausted)
            .count();
        let before = session.items.len();
        session.items.retain(|i| i.status != ItemStatus::Exhausted);
        let removed = before - session.items.len();
        session.cursor -= removed_before_cursor;

        if session.items.iter().all(|i| i.status == ItemStatus::Sent) {
            self.store.delete(&session.id).await?;
        } else {
            self.store.save(&session).await?;
        }
        info!(session_id = %id, removed, "cleared exhausted items");
        Ok(removed as u64)
    }

    /// Aggregate outcome counts for a campaign.
    pub async fn campaign_stats(&self, campaign_id: &str) -> Result<CampaignStats, SendqError> {
        self.campaigns.get_stats(campaign_id).await
    }

    fn acquire(&self) -> Result<ActiveGuard, SendqError> {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SendqError::ActiveSession);
        }
        Ok(ActiveGuard(Arc::clone(&self.active)))
    }

    fn spawn(&self, session: Session, guard: ActiveGuard) -> SessionHandle {
        let counters = Arc::new(LiveCounters::new());
        for item in &session.items {
            match item.status {
                ItemStatus::Sent => counters.record_sent(),
                ItemStatus::Exhausted => counters.record_failed(),
                _ => {}
            }
        }
        counters.set_queued(
            session
                .items
                .iter()
                .filter(|i| !i.status.is_terminal())
                .count() as u64,
        );

        let (pause_tx, pause_rx) = watch::channel(false);
        let cancel = CancellationToken::new();
        let degraded = Arc::new(AtomicBool::new(false));
        let session_id = session.id.clone();

        let send_loop = SendLoop {
            session,
            config: Arc::clone(&self.config),
            sender: Arc::clone(&self.sender),
            store: Arc::clone(&self.store),
            campaigns: Arc::clone(&self.campaigns),
            breaker: Arc::clone(&self.breaker),
            counters: Arc::clone(&counters),
            pause_rx,
            cancel: cancel.clone(),
            degraded: Arc::clone(&degraded),
        };
        let join = tokio::spawn(async move {
            let _guard = guard;
            send_loop.run().await
        });

        SessionHandle {
            session_id,
            counters,
            pause_tx,
            cancel,
            degraded,
            join: Mutex::new(Some(join)),
        }
    }
}

/// Releases the single-session slot when the loop task ends, on any path.
struct ActiveGuard(Arc<AtomicBool>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Live control surface for a running session.
pub struct SessionHandle {
    session_id: String,
    counters: Arc<LiveCounters>,
    pause_tx: watch::Sender<bool>,
    cancel: CancellationToken,
    degraded: Arc<AtomicBool>,
    join: Mutex<Option<JoinHandle<Result<(), SendqError>>>>,
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

impl SessionHandle {
    pub fn id(&self) -> &str {
        &self.session_id
    }

    /// Hold the loop after the in-flight item completes. Persisted, so a
    /// paused session survives a restart as paused.
    pub fn pause(&self) {
        let _ = self.pause_tx.send(true);
    }

    /// Release a pause.
    pub fn resume(&self) {
        let _ = self.pause_tx.send(false);
    }

    /// Stop the loop after the in-flight item completes. Remaining items
    /// stay pending in the store for a later resume.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn counters(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }

    /// Feed one carrier delivery report into the live counters.
    pub fn record_delivered(&self) {
        self.counters.record_delivered();
    }

    /// Whether the loop is running without working persistence.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    /// Wait for the loop to finish. Yields the loop's own error, if any;
    /// can only be awaited once.
    pub async fn wait(&self) -> Result<(), SendqError> {
        let join = self
            .join
            .lock()
            .await
            .take()
            .ok_or_else(|| SendqError::Internal("session already awaited".to_string()))?;
        join.await
            .map_err(|e| SendqError::Internal(format!("send loop task failed: {e}")))?
    }
}

/// Classification of one dispatch attempt.
enum Attempt {
    Accepted,
    /// Carrier-level or adapter failure; retried with backoff.
    Retryable(String),
    /// Platform refused to send at all; aborts the batch.
    Fatal(String),
}

struct SendLoop {
    session: Session,
    config: Arc<ConfigStore>,
    sender: Arc<dyn SenderAdapter>,
    store: Arc<dyn SessionStore>,
    campaigns: Arc<dyn CampaignTracker>,
    breaker: Arc<Mutex<CircuitBreaker>>,
    counters: Arc<LiveCounters>,
    pause_rx: watch::Receiver<bool>,
    cancel: CancellationToken,
    degraded: Arc<AtomicBool>,
}

impl SendLoop {
    async fn run(mut self) -> Result<(), SendqError> {
        loop {
            if self.cancel.is_cancelled() {
                self.persist().await;
                info!(session_id = %self.session.id, "send loop stopped");
                return Ok(());
            }

            if *self.pause_rx.borrow_and_update() {
                if !self.session.paused {
                    self.session.paused = true;
                    self.persist().await;
                    info!(session_id = %self.session.id, "session paused");
                }
                tokio::select! {
                    _ = self.cancel.cancelled() => {}
                    _ = self.pause_rx.changed() => {}
                }
                continue;
            }
            if self.session.paused {
                self.session.paused = false;
                self.persist().await;
                info!(session_id = %self.session.id, "session unpaused");
            }

            if self.session.cursor >= self.session.items.len() {
                return self.finish().await;
            }

            let cfg = self.config.get();

            let cooldown = Duration::from_millis(cfg.circuit_breaker_cooldown_ms);
            let gate = self.breaker.lock().await.check(cooldown);
            if let BreakerCheck::Open { remaining } = gate {
                warn!(
                    session_id = %self.session.id,
                    remaining_ms = remaining.as_millis() as u64,
                    "circuit breaker open, holding dispatch"
                );
                tokio::select! {
                    _ = self.cancel.cancelled() => {}
                    _ = tokio::time::sleep(remaining) => {}
                }
                continue;
            }

            let idx = self.session.cursor;
            if self.session.items[idx].status.is_terminal() {
                self.session.cursor += 1;
                continue;
            }
            self.session.items[idx].status = ItemStatus::Sending;
            // Write-through before dispatch: a crash from here re-sends at
            // most this one item.
            self.persist().await;
            self.update_queued();

            let recipient = self.session.items[idx].recipient.clone();
            let body = self.session.items[idx].body.clone();
            let priority = self.session.items[idx].priority;
            debug!(
                session_id = %self.session.id,
                position = idx,
                recipient = %recipient,
                attempt = self.session.items[idx].attempt_count + 1,
                "dispatching"
            );

            let attempt = match self.sender.send(&recipient, &body).await {
                Ok(DispatchOutcome::Accepted) => Attempt::Accepted,
                Ok(DispatchOutcome::Failed { code, details }) => {
                    let detail = details.unwrap_or_else(|| code.to_string());
                    if code.is_retryable() {
                        Attempt::Retryable(detail)
                    } else {
                        Attempt::Fatal(detail)
                    }
                }
                Err(SendqError::PermissionDenied(detail)) => Attempt::Fatal(detail),
                Err(e) => Attempt::Retryable(e.to_string()),
            };

            match attempt {
                Attempt::Accepted => {
                    {
                        let item = &mut self.session.items[idx];
                        item.status = ItemStatus::Sent;
                        item.last_error = None;
                    }
                    self.breaker.lock().await.record_success();
                    self.counters.record_sent();
                    self.record_campaign(idx, CampaignOutcome::Sent).await;
                    self.session.cursor += 1;
                    self.persist().await;
                    self.update_queued();
                    self.pace(priority, &cfg).await;
                }
                Attempt::Fatal(detail) => {
                    {
                        let item = &mut self.session.items[idx];
                        item.status = ItemStatus::Pending;
                        item.last_error = Some(detail.clone());
                    }
                    self.session.paused = true;
                    self.persist().await;
                    error!(
                        session_id = %self.session.id,
                        recipient = %recipient,
                        "send permission denied, aborting batch"
                    );
                    return Err(SendqError::PermissionDenied(detail));
                }
                Attempt::Retryable(detail) => {
                    let tripped = self
                        .breaker
                        .lock()
                        .await
                        .record_failure(cfg.max_consecutive_failures);
                    if tripped {
                        warn!(
                            session_id = %self.session.id,
                            failures = cfg.max_consecutive_failures,
                            cooldown_ms = cfg.circuit_breaker_cooldown_ms,
                            "circuit breaker opened"
                        );
                    }

                    let attempts = {
                        let item = &mut self.session.items[idx];
                        item.attempt_count += 1;
                        item.last_error = Some(detail.clone());
                        item.attempt_count
                    };
                    if attempts >= cfg.max_retries {
                        self.session.items[idx].status = ItemStatus::Exhausted;
                        warn!(
                            session_id = %self.session.id,
                            recipient = %recipient,
                            attempts,
                            error = %detail,
                            "retries exhausted, giving up on item"
                        );
                        self.counters.record_failed();
                        self.record_campaign(idx, CampaignOutcome::Failed).await;
                        self.session.cursor += 1;
                        self.persist().await;
                        self.update_queued();
                        self.pace(priority, &cfg).await;
                    } else {
                        self.session.items[idx].status = ItemStatus::Failed;
                        self.persist().await;
                        let delay = backoff::delay_for(
                            attempts - 1,
                            cfg.base_retry_delay_ms,
                            cfg.max_backoff_delay_ms,
                        );
                        debug!(
                            session_id = %self.session.id,
                            recipient = %recipient,
                            attempts,
                            backoff_ms = delay.as_millis() as u64,
                            error = %detail,
                            "dispatch failed, backing off"
                        );
                        // Cursor unchanged: the same item is retried in
                        // place after the backoff.
                        self.session.items[idx].status = ItemStatus::Pending;
                        tokio::select! {
                            _ = self.cancel.cancelled() => {}
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                }
            }
        }
    }

    async fn finish(self) -> Result<(), SendqError> {
        self.update_queued();
        let sent = self.session.count_with_status(ItemStatus::Sent);
        let exhausted = self.session.count_with_status(ItemStatus::Exhausted);
        if exhausted == 0 {
            if let Err(e) = self.store.delete(&self.session.id).await {
                warn!(
                    error = %e,
                    session_id = %self.session.id,
                    "failed to delete completed session"
                );
            }
        } else {
            // Kept for visibility until exhausted items are cleared.
            self.persist().await;
        }
        info!(session_id = %self.session.id, sent, exhausted, "batch complete");
        Ok(())
    }

    /// Persist the snapshot; a failing store degrades the run instead of
    /// killing it, so the remaining messages still go out.
    async fn persist(&self) {
        match self.store.save(&self.session).await {
            Ok(()) => {
                if self.degraded.swap(false, Ordering::SeqCst) {
                    info!(session_id = %self.session.id, "session persistence recovered");
                }
            }
            Err(e) => {
                if !self.degraded.swap(true, Ordering::SeqCst) {
                    warn!(
                        error = %e,
                        session_id = %self.session.id,
                        "session persistence failing, continuing in degraded mode"
                    );
                }
            }
        }
    }

    async fn record_campaign(&self, idx: usize, outcome: CampaignOutcome) {
        let item = &self.session.items[idx];
        let Some(campaign_id) = item.campaign_id.as_deref() else {
            return;
        };
        if let Err(e) = self
            .campaigns
            .record_outcome(campaign_id, item.variant_id.as_deref(), outcome)
            .await
        {
            warn!(error = %e, campaign_id, "failed to record campaign outcome");
        }
    }

    fn update_queued(&self) {
        let queued = self
            .session
            .items
            .iter()
            .filter(|i| !i.status.is_terminal())
            .count() as u64;
        self.counters.set_queued(queued);
    }

    /// Inter-message delay, scaled by the priority of the item just
    /// handled. Skipped after the last item.
    async fn pace(&self, priority: sendq_core::Priority, cfg: &QueueConfig) {
        if self.session.cursor >= self.session.items.len() {
            return;
        }
        let ms = cfg.priority_delays.for_priority(priority);
        if ms == 0 {
            return;
        }
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = tokio::time::sleep(Duration::from_millis(ms)) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use tokio::sync::Semaphore;

    use sendq_config::PriorityDelays;
    use sendq_core::{DispatchErrorCode, Priority};
    use sendq_test_utils::{
        MemoryCampaignTracker, MemorySessionStore, MockSender, ScriptedSend,
    };

    fn fast_config() -> Arc<ConfigStore> {
        Arc::new(ConfigStore::new(QueueConfig {
            delay_between_messages_ms: 0,
            max_retries: 3,
            base_retry_delay_ms: 1,
            max_backoff_delay_ms: 4,
            max_consecutive_failures: 5,
            circuit_breaker_cooldown_ms: 20,
            priority_delays: PriorityDelays {
                normal: 0,
                high: 0,
                urgent: 0,
            },
        }))
    }

    struct Fixture {
        manager: QueueManager,
        sender: Arc<MockSender>,
        store: Arc<MemorySessionStore>,
        tracker: Arc<MemoryCampaignTracker>,
    }

    fn fixture_with(sender: MockSender) -> Fixture {
        let sender = Arc::new(sender);
        let store = Arc::new(MemorySessionStore::new());
        let tracker = Arc::new(MemoryCampaignTracker::new());
        let manager = QueueManager::new(
            fast_config(),
            Arc::clone(&sender) as Arc<dyn SenderAdapter>,
            Arc::clone(&store) as Arc<dyn SessionStore>,
            Arc::clone(&tracker) as Arc<dyn CampaignTracker>,
        );
        Fixture {
            manager,
            sender,
            store,
            tracker,
        }
    }

    fn items(n: usize) -> Vec<QueueItem> {
        (0..n)
            .map(|i| QueueItem::new(format!("+1555010{i}"), format!("msg {i}"), Priority::Normal))
            .collect()
    }

    /// Sender that blocks each dispatch on a semaphore permit, so tests
    /// control exactly how far the loop gets.
    struct GatedSender {
        permits: Arc<Semaphore>,
        dispatched: AtomicUsize,
    }

    impl GatedSender {
        fn new() -> Self {
            Self {
                permits: Arc::new(Semaphore::new(0)),
                dispatched: AtomicUsize::new(0),
            }
        }

        fn release(&self, n: usize) {
            self.permits.add_permits(n);
        }

        fn dispatched(&self) -> usize {
            self.dispatched.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SenderAdapter for GatedSender {
        async fn send(&self, _recipient: &str, _body: &str) -> Result<DispatchOutcome, SendqError> {
            let permit = self.permits.acquire().await.unwrap();
            permit.forget();
            self.dispatched.fetch_add(1, Ordering::SeqCst);
            Ok(DispatchOutcome::Accepted)
        }
    }

    async fn wait_for(mut cond: impl AsyncFnMut() -> bool) {
        for _ in 0..1000 {
            if cond().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test]
    async fn sends_every_item_then_deletes_session() {
        let f = fixture_with(MockSender::new());
        let handle = f.manager.start(items(3)).await.unwrap();
        handle.wait().await.unwrap();

        let snap = handle.counters();
        assert_eq!(snap.sent, 3);
        assert_eq!(snap.failed, 0);
        assert_eq!(snap.queued, 0);
        assert_eq!(f.sender.dispatch_count().await, 3);
        assert!(f.store.get(handle.id()).await.is_none());
    }

    #[tokio::test]
    async fn empty_batch_completes_immediately() {
        let f = fixture_with(MockSender::new());
        let handle = f.manager.start(Vec::new()).await.unwrap();
        handle.wait().await.unwrap();
        assert_eq!(handle.counters(), CounterSnapshot::default());
        assert!(f.store.get(handle.id()).await.is_none());
    }

    #[tokio::test]
    async fn transient_failure_retries_in_place_then_succeeds() {
        let f = fixture_with(MockSender::with_script(vec![ScriptedSend::Outcome(
            DispatchOutcome::Failed {
                code: DispatchErrorCode::RateLimited,
                details: Some("slow down".to_string()),
            },
        )]));
        let handle = f.manager.start(items(1)).await.unwrap();
        handle.wait().await.unwrap();

        assert_eq!(f.sender.dispatch_count().await, 2);
        assert_eq!(handle.counters().sent, 1);
        assert!(f.store.get(handle.id()).await.is_none());
    }

    #[tokio::test]
    async fn exhausts_after_retry_cap_and_keeps_session() {
        let sender = MockSender::new().with_default(DispatchOutcome::Failed {
            code: DispatchErrorCode::NoSignal,
            details: None,
        });
        let f = fixture_with(sender);
        let item = QueueItem::new("+15550100", "hello", Priority::Normal)
            .with_campaign("spring", Some("a".to_string()));
        let handle = f.manager.start(vec![item]).await.unwrap();
        handle.wait().await.unwrap();

        // max_retries = 3 means three attempts total.
        assert_eq!(f.sender.dispatch_count().await, 3);
        assert_eq!(handle.counters().failed, 1);

        let stored = f.store.get(handle.id()).await.unwrap();
        assert_eq!(stored.items[0].status, ItemStatus::Exhausted);
        assert_eq!(stored.items[0].attempt_count, 3);
        assert_eq!(stored.items[0].last_error.as_deref(), Some("no_signal"));

        let recorded = f.tracker.recorded().await;
        assert_eq!(
            recorded,
            vec![(
                "spring".to_string(),
                Some("a".to_string()),
                CampaignOutcome::Failed
            )]
        );
    }

    #[tokio::test]
    async fn permission_denied_aborts_and_pauses_session() {
        let f = fixture_with(MockSender::with_script(vec![
            ScriptedSend::Outcome(DispatchOutcome::Accepted),
            ScriptedSend::Outcome(DispatchOutcome::Failed {
                code: DispatchErrorCode::PermissionDenied,
                details: Some("SEND_SMS revoked".to_string()),
            }),
        ]));
        let handle = f.manager.start(items(2)).await.unwrap();
        let err = handle.wait().await.unwrap_err();
        assert!(matches!(err, SendqError::PermissionDenied(_)));

        let stored = f.store.get(handle.id()).await.unwrap();
        assert!(stored.paused);
        assert_eq!(stored.cursor, 1);
        assert_eq!(stored.items[0].status, ItemStatus::Sent);
        assert_eq!(stored.items[1].status, ItemStatus::Pending);
        assert_eq!(
            stored.items[1].last_error.as_deref(),
            Some("SEND_SMS revoked")
        );
    }

    #[tokio::test]
    async fn rejects_second_concurrent_session() {
        let f = fixture_with(MockSender::new());
        let gated = Arc::new(GatedSender::new());
        let manager = QueueManager::new(
            fast_config(),
            Arc::clone(&gated) as Arc<dyn SenderAdapter>,
            Arc::clone(&f.store) as Arc<dyn SessionStore>,
            Arc::clone(&f.tracker) as Arc<dyn CampaignTracker>,
        );

        let handle = manager.start(items(1)).await.unwrap();
        let err = manager.start(items(1)).await.unwrap_err();
        assert!(matches!(err, SendqError::ActiveSession));

        gated.release(1);
        handle.wait().await.unwrap();

        // Slot is free again once the loop finishes.
        gated.release(1);
        let second = manager.start(items(1)).await.unwrap();
        second.wait().await.unwrap();
    }

    #[tokio::test]
    async fn resume_skips_sent_and_renormalizes_sending() {
        let f = fixture_with(MockSender::new());
        let mut session = Session::new(items(2), 0);
        session.items[0].status = ItemStatus::Sent;
        session.items[1].status = ItemStatus::Sending;
        session.cursor = 1;
        f.store.save(&session).await.unwrap();

        let handle = f.manager.resume(&session.id).await.unwrap();
        handle.wait().await.unwrap();

        let dispatched = f.sender.dispatched().await;
        assert_eq!(dispatched.len(), 1);
        assert_eq!(dispatched[0].0, session.items[1].recipient);
        assert!(f.store.get(&session.id).await.is_none());
    }

    #[tokio::test]
    async fn resume_unknown_session_fails() {
        let f = fixture_with(MockSender::new());
        let err = f.manager.resume("missing").await.unwrap_err();
        assert!(matches!(err, SendqError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn stop_leaves_remaining_items_pending() {
        let gated = Arc::new(GatedSender::new());
        let store = Arc::new(MemorySessionStore::new());
        let manager = QueueManager::new(
            fast_config(),
            Arc::clone(&gated) as Arc<dyn SenderAdapter>,
            Arc::clone(&store) as Arc<dyn SessionStore>,
            Arc::new(MemoryCampaignTracker::new()) as Arc<dyn CampaignTracker>,
        );

        let handle = manager.start(items(3)).await.unwrap();
        gated.release(1);
        wait_for(async || handle.counters().sent == 1).await;

        handle.stop();
        gated.release(10);
        handle.wait().await.unwrap();

        let stored = store.get(handle.id()).await.unwrap();
        assert_eq!(stored.items[2].status, ItemStatus::Pending);
        assert!(stored.items.iter().any(|i| i.status == ItemStatus::Pending));
    }

    #[tokio::test]
    async fn pause_gates_dispatch_until_resumed() {
        let gated = Arc::new(GatedSender::new());
        let store = Arc::new(MemorySessionStore::new());
        let manager = QueueManager::new(
            fast_config(),
            Arc::clone(&gated) as Arc<dyn SenderAdapter>,
            Arc::clone(&store) as Arc<dyn SessionStore>,
            Arc::new(MemoryCampaignTracker::new()) as Arc<dyn CampaignTracker>,
        );

        let handle = manager.start(items(3)).await.unwrap();
        gated.release(1);
        wait_for(async || handle.counters().sent == 1).await;

        handle.pause();
        gated.release(10);
        wait_for(async || {
            store
                .get(handle.id())
                .await
                .is_some_and(|s| s.paused)
        })
        .await;
        // At most the already-gated item slipped through before the pause.
        assert!(gated.dispatched() <= 2);

        handle.resume();
        handle.wait().await.unwrap();
        assert_eq!(handle.counters().sent, 3);
        assert!(store.get(handle.id()).await.is_none());
    }

    #[tokio::test]
    async fn persist_failure_degrades_but_finishes_the_batch() {
        let f = fixture_with(MockSender::new());
        let gated = Arc::new(GatedSender::new());
        let manager = QueueManager::new(
            fast_config(),
            Arc::clone(&gated) as Arc<dyn SenderAdapter>,
            Arc::clone(&f.store) as Arc<dyn SessionStore>,
            Arc::clone(&f.tracker) as Arc<dyn CampaignTracker>,
        );

        let handle = manager.start(items(2)).await.unwrap();
        f.store.set_fail_saves(true);
        gated.release(10);
        handle.wait().await.unwrap();

        assert!(handle.is_degraded());
        assert_eq!(handle.counters().sent, 2);
    }

    #[tokio::test]
    async fn start_fails_when_initial_snapshot_cannot_persist() {
        let f = fixture_with(MockSender::new());
        f.store.set_fail_saves(true);
        let err = f.manager.start(items(1)).await.unwrap_err();
        assert!(matches!(err, SendqError::Storage { .. }));

        // The slot is released; a later start succeeds.
        f.store.set_fail_saves(false);
        let handle = f.manager.start(items(1)).await.unwrap();
        handle.wait().await.unwrap();
    }

    #[tokio::test]
    async fn clear_exhausted_removes_items_and_adjusts_cursor() {
        let f = fixture_with(MockSender::new());
        let mut session = Session::new(items(3), 0);
        session.items[0].status = ItemStatus::Exhausted;
        session.items[1].status = ItemStatus::Sent;
        session.cursor = 2;
        f.store.save(&session).await.unwrap();

        let removed = f.manager.clear_exhausted(&session.id).await.unwrap();
        assert_eq!(removed, 1);

        let stored = f.store.get(&session.id).await.unwrap();
        assert_eq!(stored.items.len(), 2);
        assert_eq!(stored.cursor, 1);
        assert_eq!(stored.items[1].status, ItemStatus::Pending);
    }

    #[tokio::test]
    async fn clear_exhausted_deletes_fully_sent_session() {
        let f = fixture_with(MockSender::new());
        let mut session = Session::new(items(2), 0);
        session.items[0].status = ItemStatus::Exhausted;
        session.items[1].status = ItemStatus::Sent;
        session.cursor = 2;
        f.store.save(&session).await.unwrap();

        let removed = f.manager.clear_exhausted(&session.id).await.unwrap();
        assert_eq!(removed, 1);
        assert!(f.store.get(&session.id).await.is_none());
    }

    #[tokio::test]
    async fn breaker_trips_then_cools_down_and_batch_completes() {
        let config = Arc::new(ConfigStore::new(QueueConfig {
            delay_between_messages_ms: 0,
            max_retries: 2,
            base_retry_delay_ms: 1,
            max_backoff_delay_ms: 2,
            max_consecutive_failures: 2,
            circuit_breaker_cooldown_ms: 10,
            priority_delays: PriorityDelays {
                normal: 0,
                high: 0,
                urgent: 0,
            },
        }));
        // First item fails out entirely, tripping the breaker; the second
        // goes through once the cooldown elapses.
        let sender = Arc::new(MockSender::with_script(vec![
            ScriptedSend::Outcome(DispatchOutcome::Failed {
                code: DispatchErrorCode::Rejected,
                details: None,
            }),
            ScriptedSend::Outcome(DispatchOutcome::Failed {
                code: DispatchErrorCode::Rejected,
                details: None,
            }),
        ]));
        let store = Arc::new(MemorySessionStore::new());
        let manager = QueueManager::new(
            config,
            Arc::clone(&sender) as Arc<dyn SenderAdapter>,
            Arc::clone(&store) as Arc<dyn SessionStore>,
            Arc::new(MemoryCampaignTracker::new()) as Arc<dyn CampaignTracker>,
        );

        let handle = manager.start(items(2)).await.unwrap();
        handle.wait().await.unwrap();

        let snap = handle.counters();
        assert_eq!(snap.failed, 1);
        assert_eq!(snap.sent, 1);
        let stored = store.get(handle.id()).await.unwrap();
        assert_eq!(stored.items[0].status, ItemStatus::Exhausted);
        assert_eq!(stored.items[1].status, ItemStatus::Sent);
    }

    #[tokio::test(start_paused = true)]
    async fn pacing_follows_item_priority_and_skips_the_last_item() {
        let config = Arc::new(ConfigStore::new(QueueConfig {
            delay_between_messages_ms: 0,
            max_retries: 3,
            base_retry_delay_ms: 1,
            max_backoff_delay_ms: 4,
            max_consecutive_failures: 5,
            circuit_breaker_cooldown_ms: 20,
            priority_delays: PriorityDelays {
                normal: 1000,
                high: 500,
                urgent: 100,
            },
        }));
        let sender = Arc::new(MockSender::new());
        let manager = QueueManager::new(
            config,
            Arc::clone(&sender) as Arc<dyn SenderAdapter>,
            Arc::new(MemorySessionStore::new()) as Arc<dyn SessionStore>,
            Arc::new(MemoryCampaignTracker::new()) as Arc<dyn CampaignTracker>,
        );

        let batch = vec![
            QueueItem::new("+15550100", "a", Priority::Urgent),
            QueueItem::new("+15550101", "b", Priority::Urgent),
            QueueItem::new("+15550102", "c", Priority::Normal),
            QueueItem::new("+15550103", "d", Priority::High),
        ];
        let start = tokio::time::Instant::now();
        let handle = manager.start(batch).await.unwrap();
        handle.wait().await.unwrap();

        // The only timers in this run are the inter-message waits, so the
        // paused clock advances by exactly their sum: one urgent wait per
        // urgent item, one normal wait, and no wait after the final high
        // item. An asymmetric mix keeps a swapped priority mapping (or a
        // stray trailing wait) from landing on the same total.
        assert_eq!(
            start.elapsed(),
            Duration::from_millis(100 + 100 + 1000)
        );

        let order: Vec<String> = sender
            .dispatched()
            .await
            .into_iter()
            .map(|(recipient, _)| recipient)
            .collect();
        assert_eq!(
            order,
            vec!["+15550100", "+15550101", "+15550102", "+15550103"]
        );
    }
}
