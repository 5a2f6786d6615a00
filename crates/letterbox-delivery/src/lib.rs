//! Delivery resolution for Letterbox.
//!
//! The outbound worker only talks to [`DeliveryResolver`]. The bundled
//! [`LocalDeliveryResolver`] treats a recipient as reachable when their store
//! file exists on this host; a network transport can be plugged in as its
//! fallback, or replace it entirely, without touching the worker.

mod error;
mod local;
mod traits;

pub use error::{DeliveryError, DeliveryResult};
pub use local::{
    DirectWriter, LocalDeliveryResolver, LoopbackWriter, LOOPBACK_ACK, LOOPBACK_SENDER,
};
pub use traits::{DeliveryResolver, InboxWriter, Route, RouteKind};
