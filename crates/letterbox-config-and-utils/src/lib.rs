//! Core types, configuration, and utilities for Letterbox.

mod config;
mod error;
mod logging;
mod participant;
mod paths;

pub use config::{
    Config, DeliveryMode, RegistrationMode, DEFAULT_LOG_LEVEL, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_REGISTRATION_URL,
};
pub use error::{CoreError, CoreResult};
pub use logging::init_logging_for_service;
pub use participant::{ParticipantId, RESERVED_LOOPBACK_ID};
pub use paths::{Paths, STORE_FILE_SUFFIX};
