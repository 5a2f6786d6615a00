use letterbox_config_and_utils::{Config, Paths, RegistrationMode, DEFAULT_REGISTRATION_URL};
use letterbox_outbound_worker::OutboundWorkerConfig;

/// Settings shared by every client opened from one process.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Where store files live.
    pub paths: Paths,
    /// Base URL of the registration service.
    pub registration_url: String,
    /// Whether configured registration reports failures.
    pub registration_mode: RegistrationMode,
    pub worker: OutboundWorkerConfig,
}

impl ClientConfig {
    /// Defaults rooted at `paths`.
    pub fn new(paths: Paths) -> Self {
        Self {
            paths,
            registration_url: DEFAULT_REGISTRATION_URL.to_string(),
            registration_mode: RegistrationMode::Silent,
            worker: OutboundWorkerConfig::default(),
        }
    }

    /// Build from loaded configuration, applying its store directory override.
    pub fn from_config(config: &Config, paths: Paths) -> Self {
        Self {
            paths: config.apply_to_paths(paths),
            registration_url: config.registration_url.clone(),
            registration_mode: config.registration_mode,
            worker: OutboundWorkerConfig::from(config),
        }
    }
}
