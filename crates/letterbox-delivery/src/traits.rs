//! Capability seams between the outbound worker and delivery transports.

use crate::DeliveryResult;
use std::fmt;

/// Places one payload into some participant's inbox.
#[async_trait::async_trait]
pub trait InboxWriter: Send + Sync {
    /// Deliver `payload` attributed to `sender`.
    async fn deliver(&self, sender: &str, payload: &[u8]) -> DeliveryResult<()>;
}

/// How a [`Route`] reaches its inbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// Recipient store exists on this host.
    Direct,
    /// Reserved loop-back id; acknowledgment goes to the sender's own inbox.
    Loopback,
    /// Supplied by a fallback resolver.
    Fallback,
}

impl RouteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Loopback => "loopback",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved delivery target.
pub struct Route {
    pub kind: RouteKind,
    pub writer: Box<dyn InboxWriter>,
}

impl Route {
    pub fn new(kind: RouteKind, writer: impl InboxWriter + 'static) -> Self {
        Self {
            kind,
            writer: Box::new(writer),
        }
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route").field("kind", &self.kind).finish_non_exhaustive()
    }
}

/// Finds where a recipient's messages should go.
///
/// `Ok(None)` means the recipient is unreachable and the payload is dropped.
#[async_trait::async_trait]
pub trait DeliveryResolver: Send + Sync {
    async fn resolve(&self, recipient: &str) -> DeliveryResult<Option<Route>>;
}
