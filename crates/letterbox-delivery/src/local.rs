//! Same-host delivery through participant store files.

use crate::{DeliveryError, DeliveryResolver, DeliveryResult, InboxWriter, Route, RouteKind};
use chrono::Utc;
use letterbox_config_and_utils::{ParticipantId, Paths};
use letterbox_store::LocalStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, trace};

/// Sender name attached to synthesized loop-back acknowledgments.
pub const LOOPBACK_SENDER: &str = "Protocol_Service";

/// Payload of the synthesized loop-back acknowledgment.
pub const LOOPBACK_ACK: &[u8] = b"Identity verified. Transmission loop back successful.";

/// Resolves recipients to store files under one store directory.
///
/// An existing file is treated as reachable. The reserved loop-back id gets
/// an acknowledgment in the owner's own inbox. Anything else goes to the
/// optional fallback, or is dropped.
#[derive(Clone)]
pub struct LocalDeliveryResolver {
    paths: Paths,
    own_store: LocalStore,
    fallback: Option<Arc<dyn DeliveryResolver>>,
}

impl LocalDeliveryResolver {
    pub fn new(paths: Paths, own_store: LocalStore) -> Self {
        Self {
            paths,
            own_store,
            fallback: None,
        }
    }

    /// Consult `fallback` for recipients with no store on this host.
    pub fn with_fallback(mut self, fallback: Arc<dyn DeliveryResolver>) -> Self {
        self.fallback = Some(fallback);
        self
    }
}

#[async_trait::async_trait]
impl DeliveryResolver for LocalDeliveryResolver {
    async fn resolve(&self, recipient: &str) -> DeliveryResult<Option<Route>> {
        let participant = ParticipantId::parse(recipient)
            .map_err(|e| DeliveryError::InvalidRecipient(e.to_string()))?;

        let store_file = self.paths.store_file(&participant);
        if store_file.is_file() {
            trace!(recipient = %participant, path = %store_file.display(), "Recipient store found");
            return Ok(Some(Route::new(RouteKind::Direct, DirectWriter::new(store_file))));
        }

        if participant.is_reserved_loopback() {
            return Ok(Some(Route::new(
                RouteKind::Loopback,
                LoopbackWriter::new(self.own_store.clone()),
            )));
        }

        match &self.fallback {
            Some(fallback) => {
                let route = fallback.resolve(participant.as_str()).await?;
                Ok(route.map(|route| Route {
                    kind: RouteKind::Fallback,
                    writer: route.writer,
                }))
            }
            None => {
                debug!(recipient = %participant, "Recipient unreachable, no fallback configured");
                Ok(None)
            }
        }
    }
}

/// Appends to another participant's inbox by opening their store file.
pub struct DirectWriter {
    store_file: PathBuf,
}

impl DirectWriter {
    pub fn new(store_file: PathBuf) -> Self {
        Self { store_file }
    }
}

#[async_trait::async_trait]
impl InboxWriter for DirectWriter {
    async fn deliver(&self, sender: &str, payload: &[u8]) -> DeliveryResult<()> {
        let store = LocalStore::open_existing(&self.store_file).await?;
        store.insert_inbox(sender, payload, Utc::now()).await?;
        store.close().await?;
        Ok(())
    }
}

/// Writes the fixed acknowledgment into the sender's own inbox.
pub struct LoopbackWriter {
    own_store: LocalStore,
}

impl LoopbackWriter {
    pub fn new(own_store: LocalStore) -> Self {
        Self { own_store }
    }
}

#[async_trait::async_trait]
impl InboxWriter for LoopbackWriter {
    async fn deliver(&self, _sender: &str, _payload: &[u8]) -> DeliveryResult<()> {
        self.own_store
            .insert_inbox(LOOPBACK_SENDER, LOOPBACK_ACK, Utc::now())
            .await?;
        Ok(())
    }
}
