use crate::config::is_due;
use crate::{DeliveryPolicy, OutboundWorkerConfig, PassReport};
use chrono::Utc;
use letterbox_config_and_utils::ParticipantId;
use letterbox_delivery::{DeliveryResolver, DeliveryResult, RouteKind};
use letterbox_store::{LocalStore, OutboundRecord, OutboundStatus, StorageResult};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Drains one participant's outbound queue on a fixed interval.
///
/// # Lifecycle
///
/// 1. Create with [`OutboundWorker::new()`]
/// 2. [`start()`](Self::start) spawns the background loop; calling it again
///    while the loop is alive is a no-op
/// 3. [`stop()`](Self::stop) signals the loop; a pass already running
///    completes first
/// 4. [`shutdown()`](Self::shutdown) signals and waits for that pass
pub struct OutboundWorker {
    runner: PassRunner,
    config: OutboundWorkerConfig,
    task: Mutex<Option<RunningTask>>,
}

struct RunningTask {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
    /// Loops replaced by a restart that may still be finishing a pass.
    retired: Vec<JoinHandle<()>>,
}

impl RunningTask {
    /// Alive and not yet told to stop.
    fn is_active(&self) -> bool {
        !self.handle.is_finished() && !*self.stop_tx.borrow()
    }
}

/// Everything a pass needs, cloned into the background task.
#[derive(Clone)]
struct PassRunner {
    sender: ParticipantId,
    store: LocalStore,
    resolver: Arc<dyn DeliveryResolver>,
    policy: DeliveryPolicy,
}

impl OutboundWorker {
    pub fn new(
        sender: ParticipantId,
        store: LocalStore,
        resolver: Arc<dyn DeliveryResolver>,
        config: OutboundWorkerConfig,
    ) -> Self {
        Self {
            runner: PassRunner {
                sender,
                store,
                resolver,
                policy: config.policy,
            },
            config,
            task: Mutex::new(None),
        }
    }

    /// Whether the background loop is alive.
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    /// Spawn the background loop. Returns false if one is already alive and
    /// has not been told to stop.
    ///
    /// A loop that is still finishing its last pass after [`stop()`](Self::stop)
    /// does not block a restart; [`shutdown()`](Self::shutdown) waits for it too.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> bool {
        let mut guard = self.task.lock();
        if guard.as_ref().is_some_and(RunningTask::is_active) {
            debug!(participant_id = %self.runner.sender, "Outbound worker already running");
            return false;
        }

        let mut retired = Vec::new();
        if let Some(previous) = guard.take() {
            retired.extend(previous.retired.into_iter().filter(|h| !h.is_finished()));
            if !previous.handle.is_finished() {
                retired.push(previous.handle);
            }
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let runner = self.runner.clone();
        let poll_interval = self.config.poll_interval;
        let handle = tokio::spawn(run_loop(runner, poll_interval, stop_rx));

        *guard = Some(RunningTask {
            stop_tx,
            handle,
            retired,
        });
        info!(
            participant_id = %self.runner.sender,
            poll_interval_ms = poll_interval.as_millis() as u64,
            "Outbound worker started"
        );
        true
    }

    /// Signal the loop to exit after the current pass. Does not wait.
    pub fn stop(&self) {
        if let Some(task) = self.task.lock().as_ref() {
            // Receiver gone means the loop already exited
            let _ = task.stop_tx.send(true);
        }
    }

    /// Signal the loop and wait for any in-flight pass to finish.
    pub async fn shutdown(&self) {
        let task = self.task.lock().take();
        let Some(task) = task else {
            return;
        };

        let _ = task.stop_tx.send(true);
        for handle in task.retired.into_iter().chain(std::iter::once(task.handle)) {
            if let Err(e) = handle.await {
                warn!(participant_id = %self.runner.sender, error = %e, "Outbound worker task ended abnormally");
            }
        }
        info!(participant_id = %self.runner.sender, "Outbound worker stopped");
    }

    /// Run one pass over the queue now, independent of the schedule.
    pub async fn run_pass(&self) -> StorageResult<PassReport> {
        self.runner.run_pass().await
    }
}

impl Drop for OutboundWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_loop(
    runner: PassRunner,
    poll_interval: std::time::Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = stop_rx.changed() => {
                debug!(participant_id = %runner.sender, "Outbound worker received stop signal");
                break;
            }
            _ = ticker.tick() => {
                match runner.run_pass().await {
                    Ok(report) if !report.is_empty() => {
                        info!(
                            participant_id = %runner.sender,
                            fetched = report.fetched,
                            delivered = report.delivered,
                            looped_back = report.looped_back,
                            via_fallback = report.via_fallback,
                            dropped = report.dropped,
                            failed = report.failed,
                            retried = report.retried,
                            "Outbound pass complete"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(participant_id = %runner.sender, error = %e, "Outbound pass failed to read queue");
                    }
                }
            }
        }
    }
}

impl PassRunner {
    async fn run_pass(&self) -> StorageResult<PassReport> {
        match self.policy {
            DeliveryPolicy::FireAndForget => self.run_fire_and_forget().await,
            DeliveryPolicy::Confirmed {
                max_attempts,
                backoff_base,
                backoff_max,
            } => {
                self.run_confirmed(max_attempts, backoff_base, backoff_max)
                    .await
            }
        }
    }

    async fn run_fire_and_forget(&self) -> StorageResult<PassReport> {
        let records = self.store.list_pending_outbound().await?;
        let mut report = PassReport {
            fetched: records.len(),
            ..PassReport::default()
        };

        for record in records {
            match self.store.mark_sent(record.id, Utc::now()).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!(record_id = record.id, "Record no longer pending, skipping");
                    continue;
                }
                Err(e) => {
                    error!(record_id = record.id, error = %e, "Failed to mark record sent");
                    report.failed += 1;
                    continue;
                }
            }

            match self.deliver(&record).await {
                Ok(Some(kind)) => {
                    debug!(record_id = record.id, recipient = %record.recipient, route = %kind, "Delivered");
                    report.record_route(kind);
                }
                Ok(None) => {
                    debug!(record_id = record.id, recipient = %record.recipient, "Recipient unreachable, message dropped");
                    report.dropped += 1;
                }
                Err(e) => {
                    warn!(record_id = record.id, recipient = %record.recipient, error = %e, "Delivery failed");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    async fn run_confirmed(
        &self,
        max_attempts: u32,
        backoff_base: std::time::Duration,
        backoff_max: std::time::Duration,
    ) -> StorageResult<PassReport> {
        let now = Utc::now();
        let records: Vec<OutboundRecord> = self
            .store
            .list_retryable_outbound()
            .await?
            .into_iter()
            .filter(|record| {
                record.status == OutboundStatus::Pending
                    || is_due(record.last_attempt, record.attempts, now, backoff_base, backoff_max)
            })
            .collect();

        let mut report = PassReport {
            fetched: records.len(),
            ..PassReport::default()
        };

        for record in records {
            match self.store.mark_attempted(record.id, Utc::now()).await {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    error!(record_id = record.id, error = %e, "Failed to mark record attempted");
                    report.failed += 1;
                    continue;
                }
            }
            let attempts = record.attempts + 1;

            let reason = match self.deliver(&record).await {
                Ok(Some(kind)) => {
                    match self.store.mark_delivered(record.id).await {
                        Ok(_) => report.record_route(kind),
                        Err(e) => {
                            error!(record_id = record.id, error = %e, "Failed to mark record delivered");
                            report.failed += 1;
                        }
                    }
                    continue;
                }
                Ok(None) => "recipient unreachable".to_string(),
                Err(e) => e.to_string(),
            };

            let outcome = if attempts >= max_attempts {
                warn!(record_id = record.id, recipient = %record.recipient, attempts, reason = %reason, "Giving up on record");
                report.failed += 1;
                self.store.mark_failed(record.id, &reason).await
            } else {
                debug!(record_id = record.id, attempts, reason = %reason, "Delivery will be retried");
                report.retried += 1;
                self.store.record_attempt_error(record.id, &reason).await
            };
            if let Err(e) = outcome {
                error!(record_id = record.id, error = %e, "Failed to record delivery outcome");
            }
        }

        Ok(report)
    }

    async fn deliver(&self, record: &OutboundRecord) -> DeliveryResult<Option<RouteKind>> {
        let Some(route) = self.resolver.resolve(&record.recipient).await? else {
            return Ok(None);
        };
        route
            .writer
            .deliver(self.sender.as_str(), &record.payload)
            .await?;
        Ok(Some(route.kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use letterbox_config_and_utils::Paths;
    use letterbox_delivery::{
        DeliveryError, InboxWriter, LocalDeliveryResolver, Route, LOOPBACK_ACK, LOOPBACK_SENDER,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        _dir: TempDir,
        paths: Paths,
        alice: ParticipantId,
        store: LocalStore,
    }

    async fn fixture() -> Fixture {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        let alice = ParticipantId::parse("alice").unwrap();
        let store = LocalStore::open(&paths.store_file(&alice)).await.unwrap();
        Fixture {
            _dir: dir,
            paths,
            alice,
            store,
        }
    }

    fn local_worker(f: &Fixture, policy: DeliveryPolicy) -> OutboundWorker {
        let resolver = Arc::new(LocalDeliveryResolver::new(f.paths.clone(), f.store.clone()));
        OutboundWorker::new(
            f.alice.clone(),
            f.store.clone(),
            resolver,
            OutboundWorkerConfig {
                poll_interval: Duration::from_millis(20),
                policy,
            },
        )
    }

    /// Errors for `poisoned`, routes everyone else to a counting writer.
    struct PoisonedResolver {
        poisoned: &'static str,
        writes: Arc<AtomicUsize>,
    }

    struct CountingWriter(Arc<AtomicUsize>);

    #[async_trait::async_trait]
    impl InboxWriter for CountingWriter {
        async fn deliver(&self, _sender: &str, _payload: &[u8]) -> DeliveryResult<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl DeliveryResolver for PoisonedResolver {
        async fn resolve(&self, recipient: &str) -> DeliveryResult<Option<Route>> {
            if recipient == self.poisoned {
                return Err(DeliveryError::Transport("boom".into()));
            }
            Ok(Some(Route::new(
                RouteKind::Fallback,
                CountingWriter(self.writes.clone()),
            )))
        }
    }

    #[tokio::test]
    async fn pass_marks_every_record_sent() {
        let f = fixture().await;
        let bob = ParticipantId::parse("bob").unwrap();
        let bob_store = LocalStore::open(&f.paths.store_file(&bob)).await.unwrap();

        f.store.enqueue_outbound("bob", b"hi").await.unwrap();
        f.store.enqueue_outbound("nobody", b"lost").await.unwrap();

        let worker = local_worker(&f, DeliveryPolicy::FireAndForget);
        let report = worker.run_pass().await.unwrap();
        assert_eq!(report.fetched, 2);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.dropped, 1);

        for record in f.store.list_outbound().await.unwrap() {
            assert_eq!(record.status, OutboundStatus::Sent);
            assert_eq!(record.attempts, 1);
        }
        let inbox = bob_store.list_inbox().await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].sender, "alice");
    }

    #[tokio::test]
    async fn repeated_passes_do_not_duplicate() {
        let f = fixture().await;
        let bob = ParticipantId::parse("bob").unwrap();
        let bob_store = LocalStore::open(&f.paths.store_file(&bob)).await.unwrap();
        f.store.enqueue_outbound("bob", b"once").await.unwrap();

        let worker = local_worker(&f, DeliveryPolicy::FireAndForget);
        worker.run_pass().await.unwrap();
        let second = worker.run_pass().await.unwrap();
        assert!(second.is_empty());

        assert_eq!(bob_store.list_inbox().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn loopback_acknowledges_each_record() {
        let f = fixture().await;
        f.store.enqueue_outbound("protocol_service", b"1").await.unwrap();
        f.store.enqueue_outbound("protocol_service", b"2").await.unwrap();

        let worker = local_worker(&f, DeliveryPolicy::FireAndForget);
        let report = worker.run_pass().await.unwrap();
        assert_eq!(report.looped_back, 2);

        let inbox = f.store.list_inbox().await.unwrap();
        assert_eq!(inbox.len(), 2);
        assert!(inbox
            .iter()
            .all(|r| r.sender == LOOPBACK_SENDER && r.payload == LOOPBACK_ACK));
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_the_pass() {
        let f = fixture().await;
        let writes = Arc::new(AtomicUsize::new(0));
        let resolver = Arc::new(PoisonedResolver {
            poisoned: "mallory",
            writes: writes.clone(),
        });
        let worker = OutboundWorker::new(
            f.alice.clone(),
            f.store.clone(),
            resolver,
            OutboundWorkerConfig::default(),
        );

        f.store.enqueue_outbound("mallory", b"x").await.unwrap();
        f.store.enqueue_outbound("bob", b"y").await.unwrap();

        let report = worker.run_pass().await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.via_fallback, 1);
        assert_eq!(writes.load(Ordering::SeqCst), 1);
        // Fire-and-forget never re-queues
        assert_eq!(f.store.pending_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn confirmed_retries_then_fails() {
        let f = fixture().await;
        let id = f.store.enqueue_outbound("nobody", b"x").await.unwrap();
        let worker = local_worker(
            &f,
            DeliveryPolicy::Confirmed {
                max_attempts: 2,
                backoff_base: Duration::ZERO,
                backoff_max: Duration::ZERO,
            },
        );

        let first = worker.run_pass().await.unwrap();
        assert_eq!(first.retried, 1);
        let record = f.store.get_outbound(id).await.unwrap().unwrap();
        assert_eq!(record.status, OutboundStatus::Attempted);
        assert_eq!(record.last_error.as_deref(), Some("recipient unreachable"));

        let second = worker.run_pass().await.unwrap();
        assert_eq!(second.failed, 1);
        let record = f.store.get_outbound(id).await.unwrap().unwrap();
        assert_eq!(record.status, OutboundStatus::Failed);
        assert_eq!(record.attempts, 2);

        assert!(worker.run_pass().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn confirmed_delivers_once_recipient_appears() {
        let f = fixture().await;
        let id = f.store.enqueue_outbound("bob", b"late").await.unwrap();
        let worker = local_worker(
            &f,
            DeliveryPolicy::Confirmed {
                max_attempts: 5,
                backoff_base: Duration::ZERO,
                backoff_max: Duration::ZERO,
            },
        );

        worker.run_pass().await.unwrap();
        let bob = ParticipantId::parse("bob").unwrap();
        let bob_store = LocalStore::open(&f.paths.store_file(&bob)).await.unwrap();

        let report = worker.run_pass().await.unwrap();
        assert_eq!(report.delivered, 1);
        let record = f.store.get_outbound(id).await.unwrap().unwrap();
        assert_eq!(record.status, OutboundStatus::Delivered);
        assert_eq!(bob_store.list_inbox().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn confirmed_respects_backoff() {
        let f = fixture().await;
        f.store.enqueue_outbound("nobody", b"x").await.unwrap();
        let worker = local_worker(
            &f,
            DeliveryPolicy::Confirmed {
                max_attempts: 5,
                backoff_base: Duration::from_secs(60),
                backoff_max: Duration::from_secs(60),
            },
        );

        assert_eq!(worker.run_pass().await.unwrap().retried, 1);
        // Not due for another minute
        assert!(worker.run_pass().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn start_is_idempotent() {
        let f = fixture().await;
        let worker = local_worker(&f, DeliveryPolicy::FireAndForget);

        assert!(worker.start());
        assert!(!worker.start());
        assert!(worker.is_running());

        worker.shutdown().await;
        assert!(!worker.is_running());
        assert!(worker.start());
        worker.shutdown().await;
    }

    #[tokio::test]
    async fn start_after_stop_spawns_fresh_loop() {
        let f = fixture().await;
        let worker = local_worker(&f, DeliveryPolicy::FireAndForget);

        assert!(worker.start());
        worker.stop();
        assert!(worker.start());
        assert!(!worker.start());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(worker.is_running());

        f.store.enqueue_outbound("protocol_service", b"ping").await.unwrap();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while f.store.pending_count().await.unwrap() > 0 {
            assert!(tokio::time::Instant::now() < deadline, "restarted loop never drained");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        worker.shutdown().await;
        assert!(!worker.is_running());
        assert_eq!(f.store.list_inbox().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn background_loop_drains_queue() {
        let f = fixture().await;
        let worker = local_worker(&f, DeliveryPolicy::FireAndForget);
        worker.start();

        f.store.enqueue_outbound("protocol_service", b"ping").await.unwrap();

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while f.store.pending_count().await.unwrap() > 0 {
            assert!(tokio::time::Instant::now() < deadline, "queue never drained");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        worker.shutdown().await;

        assert_eq!(f.store.list_inbox().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stop_does_not_wait() {
        let f = fixture().await;
        let worker = local_worker(&f, DeliveryPolicy::FireAndForget);
        worker.start();
        worker.stop();
        worker.shutdown().await;
        assert!(!worker.is_running());
    }
}
