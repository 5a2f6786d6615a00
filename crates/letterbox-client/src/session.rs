//! Owned mapping from participant id to running client.

use crate::client::Client;
use crate::config::ClientConfig;
use crate::error::{SessionError, SessionResult};
use letterbox_config_and_utils::ParticipantId;
use letterbox_store::Message;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Creates a running client on first login and drains it on logout.
pub struct SessionRegistry {
    config: ClientConfig,
    sessions: RwLock<HashMap<ParticipantId, Arc<Client>>>,
}

impl SessionRegistry {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Get or create the session for `id`, starting its worker.
    ///
    /// The store is opened without holding the registry lock. When two
    /// logins for the same id race, the first one inserted wins and the
    /// other's unstarted client is dropped.
    pub async fn login(&self, id: &str) -> SessionResult<Arc<Client>> {
        let participant = ParticipantId::parse(id)
            .map_err(|e| SessionError::BadRequest(e.to_string()))?;

        if let Some(client) = self.sessions.read().await.get(&participant) {
            return Ok(client.clone());
        }

        let opened = Arc::new(Client::open(participant.clone(), &self.config).await?);

        let mut sessions = self.sessions.write().await;
        if let Some(existing) = sessions.get(&participant) {
            debug!(participant_id = %participant, "Session created concurrently, reusing it");
            return Ok(existing.clone());
        }
        opened.start();
        sessions.insert(participant.clone(), opened.clone());

        info!(participant_id = %participant, "Session created");
        Ok(opened)
    }

    /// Active session for `caller`, if any.
    pub async fn session(&self, caller: &str) -> Option<Arc<Client>> {
        let participant = ParticipantId::parse(caller).ok()?;
        self.sessions.read().await.get(&participant).cloned()
    }

    async fn require(&self, caller: &str) -> SessionResult<Arc<Client>> {
        self.session(caller)
            .await
            .ok_or_else(|| SessionError::Unauthorized(format!("no active session for {caller:?}")))
    }

    /// Queue `payload` from `caller` to `recipient`.
    pub async fn send(&self, caller: &str, recipient: &str, payload: &[u8]) -> SessionResult<i64> {
        let client = self.require(caller).await?;

        if recipient.trim().is_empty() || payload.is_empty() {
            return Err(SessionError::BadRequest("missing recipient or message".into()));
        }

        Ok(client.send(recipient, payload).await?)
    }

    /// All messages visible to `caller`.
    pub async fn list_messages(&self, caller: &str) -> SessionResult<Vec<Message>> {
        let client = self.require(caller).await?;
        Ok(client.list_messages().await?)
    }

    /// End the session for `caller`, draining its worker. Returns whether one existed.
    pub async fn logout(&self, caller: &str) -> bool {
        let Ok(participant) = ParticipantId::parse(caller) else {
            return false;
        };

        let removed = self.sessions.write().await.remove(&participant);
        match removed {
            Some(client) => {
                client.shutdown().await;
                info!(participant_id = %participant, "Session ended");
                true
            }
            None => false,
        }
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drain every session.
    pub async fn shutdown_all(&self) {
        let clients: Vec<Arc<Client>> = self
            .sessions
            .write()
            .await
            .drain()
            .map(|(_, c)| c)
            .collect();
        for client in clients {
            client.shutdown().await;
        }
    }
}
