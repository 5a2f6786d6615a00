//! Letterbox client and session registry.
//!
//! ```text
//! caller ── Client::send ──▶ outbound_queue ─[every 1s]─▶ OutboundWorker
//!                                                   │
//!                                      DeliveryResolver ──▶ recipient inbox
//! ```
//!
//! - [`Client`]: one participant's store and worker, plus registration
//! - [`SessionRegistry`]: login / send / list_messages / logout keyed by id
//! - [`RegistrationClient`]: `POST {endpoint}/keys/upload`

mod client;
mod config;
mod error;
mod registration;
mod session;

#[cfg(test)]
mod tests;

pub use client::Client;
pub use config::ClientConfig;
pub use error::{
    ClientError, ClientResult, RegistrationError, RegistrationResult, SessionError, SessionResult,
};
pub use registration::{KeyBundle, RegistrationClient, RegistrationOutcome};
pub use session::SessionRegistry;

pub use letterbox_outbound_worker::{DeliveryPolicy, OutboundWorkerConfig, PassReport};
pub use letterbox_store::{Direction, Message, OutboundStatus};
