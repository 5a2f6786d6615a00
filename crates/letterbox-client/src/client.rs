//! A participant's client: one store, one outbound worker.

use crate::config::ClientConfig;
use crate::error::{ClientResult, RegistrationResult};
use crate::registration::{KeyBundle, RegistrationClient, RegistrationOutcome};
use letterbox_config_and_utils::{ParticipantId, RegistrationMode};
use letterbox_delivery::{DeliveryResolver, LocalDeliveryResolver};
use letterbox_outbound_worker::{OutboundWorker, PassReport};
use letterbox_store::{LocalStore, Message};
use std::sync::Arc;
use tracing::{info, warn};

/// Store-and-forward client for one participant.
///
/// `send` only writes the local outbound queue; delivery happens on the
/// worker's schedule after [`start`](Self::start).
pub struct Client {
    participant: ParticipantId,
    store: LocalStore,
    worker: OutboundWorker,
    registration: RegistrationClient,
    registration_mode: RegistrationMode,
    key_bundle: KeyBundle,
}

impl Client {
    /// Open (initializing if needed) the participant's store with same-host delivery.
    pub async fn open(participant: ParticipantId, config: &ClientConfig) -> ClientResult<Self> {
        let store = LocalStore::open(&config.paths.store_file(&participant)).await?;
        let resolver = Arc::new(LocalDeliveryResolver::new(
            config.paths.clone(),
            store.clone(),
        ));
        Ok(Self::assemble(participant, store, resolver, config))
    }

    /// Open with a caller-supplied resolver in place of same-host delivery.
    pub async fn open_with_resolver(
        participant: ParticipantId,
        config: &ClientConfig,
        resolver: Arc<dyn DeliveryResolver>,
    ) -> ClientResult<Self> {
        let store = LocalStore::open(&config.paths.store_file(&participant)).await?;
        Ok(Self::assemble(participant, store, resolver, config))
    }

    fn assemble(
        participant: ParticipantId,
        store: LocalStore,
        resolver: Arc<dyn DeliveryResolver>,
        config: &ClientConfig,
    ) -> Self {
        let worker = OutboundWorker::new(
            participant.clone(),
            store.clone(),
            resolver,
            config.worker.clone(),
        );
        Self {
            participant,
            store,
            worker,
            registration: RegistrationClient::new(config.registration_url.clone()),
            registration_mode: config.registration_mode,
            key_bundle: KeyBundle::placeholder(),
        }
    }

    /// Replace the placeholder key bundle used for registration.
    pub fn with_key_bundle(mut self, bundle: KeyBundle) -> Self {
        self.key_bundle = bundle;
        self
    }

    /// Replace the registration client built from configuration.
    pub fn with_registration_client(mut self, registration: RegistrationClient) -> Self {
        self.registration = registration;
        self
    }

    pub fn participant(&self) -> &ParticipantId {
        &self.participant
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Spawn the background worker. Returns false if it is already running.
    pub fn start(&self) -> bool {
        let started = self.worker.start();
        if started {
            info!(participant_id = %self.participant, "Client started");
        }
        started
    }

    /// Ask the worker to halt after its current pass.
    pub fn stop(&self) {
        self.worker.stop();
    }

    /// Stop and wait for the in-flight pass to drain.
    pub async fn shutdown(&self) {
        self.worker.shutdown().await;
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_running()
    }

    /// Queue `message` for `recipient` and return the record id immediately.
    pub async fn send(&self, recipient: &str, message: impl AsRef<[u8]>) -> ClientResult<i64> {
        let recipient = ParticipantId::parse(recipient)?;
        let id = self
            .store
            .enqueue_outbound(recipient.as_str(), message.as_ref())
            .await?;
        info!(participant_id = %self.participant, recipient = %recipient, record_id = id, "Message queued");
        Ok(id)
    }

    /// Run one delivery pass now, outside the schedule.
    pub async fn flush(&self) -> ClientResult<PassReport> {
        Ok(self.worker.run_pass().await?)
    }

    /// Best-effort registration. Failures are logged and absorbed.
    pub async fn register(&self) {
        info!(participant_id = %self.participant, "Registering identity");
        if let Err(e) = self.register_strict().await {
            warn!(participant_id = %self.participant, error = %e, "Registration failed");
        }
    }

    /// Registration that reports failures to the caller.
    pub async fn register_strict(&self) -> RegistrationResult<RegistrationOutcome> {
        let outcome = self
            .registration
            .register(&self.participant, &self.key_bundle)
            .await?;
        info!(participant_id = %self.participant, outcome = ?outcome, "Identity registered");
        Ok(outcome)
    }

    /// Register according to the configured [`RegistrationMode`].
    ///
    /// Silent mode always returns `Ok(None)`.
    pub async fn register_configured(&self) -> RegistrationResult<Option<RegistrationOutcome>> {
        match self.registration_mode {
            RegistrationMode::Silent => {
                self.register().await;
                Ok(None)
            }
            RegistrationMode::Strict => self.register_strict().await.map(Some),
        }
    }

    /// Inbox and outbound messages merged in timestamp order.
    pub async fn list_messages(&self) -> ClientResult<Vec<Message>> {
        Ok(self.store.read_all().await?)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("participant", &self.participant)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}
