//! Identity registration client.
//!
//! One call: `POST {endpoint}/keys/upload` with a JSON key bundle. Key
//! material is produced elsewhere; [`KeyBundle::placeholder`] fills the
//! fields with fixed-width stand-in hex.

use crate::error::{RegistrationError, RegistrationResult};
use letterbox_config_and_utils::ParticipantId;
use reqwest::StatusCode;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Key material uploaded for a participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBundle {
    pub identity_key: String,
    pub signed_pre_key: String,
    pub signed_pre_key_sig: String,
    pub one_time_pre_keys: Vec<String>,
}

impl KeyBundle {
    /// Stand-in bundle: 64, 64 and 128 hex characters, no one-time keys.
    pub fn placeholder() -> Self {
        Self {
            identity_key: "a".repeat(64),
            signed_pre_key: "b".repeat(64),
            signed_pre_key_sig: "c".repeat(128),
            one_time_pre_keys: Vec::new(),
        }
    }
}

/// Request body for `/keys/upload`.
#[derive(Debug, Serialize)]
struct KeyUpload<'a> {
    user_id: &'a str,
    identity_key: &'a str,
    signed_pre_key: &'a str,
    signed_pre_key_sig: &'a str,
    one_time_pre_keys: &'a [String],
}

/// Successful registration results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// 2xx: the identity was accepted.
    Registered,
    /// 409: the identity already exists, which counts as success.
    AlreadyRegistered,
}

/// HTTP client for the identity registration service.
#[derive(Clone)]
pub struct RegistrationClient {
    http_client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl RegistrationClient {
    /// Create a client for the service at `endpoint` (e.g. `http://localhost:8000`).
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Use a preconfigured reqwest client (proxy, TLS settings).
    pub fn with_http_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = http_client;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn upload_url(&self) -> String {
        format!("{}/keys/upload", self.endpoint.trim_end_matches('/'))
    }

    /// Upload `bundle` for `participant`.
    pub async fn register(
        &self,
        participant: &ParticipantId,
        bundle: &KeyBundle,
    ) -> RegistrationResult<RegistrationOutcome> {
        let body = KeyUpload {
            user_id: participant.as_str(),
            identity_key: &bundle.identity_key,
            signed_pre_key: &bundle.signed_pre_key,
            signed_pre_key_sig: &bundle.signed_pre_key_sig,
            one_time_pre_keys: &bundle.one_time_pre_keys,
        };

        debug!(participant_id = %participant, url = %self.upload_url(), "Uploading key bundle");

        let response = self
            .http_client
            .post(self.upload_url())
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?;

        self.check_response(response).await
    }

    /// Map the response status to an outcome.
    async fn check_response(
        &self,
        response: reqwest::Response,
    ) -> RegistrationResult<RegistrationOutcome> {
        let status = response.status();
        if status.is_success() {
            return Ok(RegistrationOutcome::Registered);
        }
        if status == StatusCode::CONFLICT {
            return Ok(RegistrationOutcome::AlreadyRegistered);
        }

        let body = response.text().await.unwrap_or_default();
        error!("Registration request failed: {} - {}", status.as_u16(), body);
        Err(RegistrationError::Rejected {
            status: status.as_u16(),
            message: body,
        })
    }
}

impl std::fmt::Debug for RegistrationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}
