//! Configuration management.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default identity registration endpoint.
pub const DEFAULT_REGISTRATION_URL: &str = "http://localhost:8000";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default outbound processing interval.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// How the outbound worker treats status around delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Mark sent before delivering; never retry.
    #[default]
    FireAndForget,
    /// Mark attempted, confirm on successful write, retry with backoff.
    Confirmed,
}

/// How registration failures are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationMode {
    /// Log and absorb failures.
    #[default]
    Silent,
    /// Return failures to the caller.
    Strict,
}

/// Main Letterbox configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Base URL of the identity registration service.
    pub registration_url: String,
    /// Registration failure policy.
    pub registration_mode: RegistrationMode,
    /// Interval between outbound processing passes, in milliseconds.
    pub poll_interval_ms: u64,
    /// Outbound status policy.
    pub delivery_mode: DeliveryMode,
    /// Attempts before a record is marked failed (confirmed mode only).
    pub max_attempts: u32,
    /// First retry delay in milliseconds (confirmed mode only).
    pub backoff_base_ms: u64,
    /// Retry delay cap in milliseconds (confirmed mode only).
    pub backoff_max_ms: u64,
    /// Override for the store directory. Defaults to `{base_dir}/stores`.
    pub store_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            registration_url: DEFAULT_REGISTRATION_URL.to_string(),
            registration_mode: RegistrationMode::Silent,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            delivery_mode: DeliveryMode::FireAndForget,
            max_attempts: 5,
            backoff_base_ms: 2_000,
            backoff_max_ms: 300_000,
            store_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from `paths.config_file()`, falling back to defaults,
    /// then apply environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    /// Reject values the worker cannot run with.
    pub fn validate(&self) -> CoreResult<()> {
        if self.poll_interval_ms == 0 {
            return Err(CoreError::Config(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.delivery_mode == DeliveryMode::Confirmed && self.max_attempts == 0 {
            return Err(CoreError::Config(
                "max_attempts must be at least 1 in confirmed mode".to_string(),
            ));
        }
        if self.registration_url.trim().is_empty() {
            return Err(CoreError::Config("registration_url is empty".to_string()));
        }
        Ok(())
    }

    /// Processing interval as a Duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Apply the configured store directory override to `paths`.
    pub fn apply_to_paths(&self, paths: Paths) -> Paths {
        match &self.store_dir {
            Some(dir) => paths.with_store_dir(dir.clone()),
            None => paths,
        }
    }

    fn load_from_env(&mut self) {
        if let Ok(log_level) = std::env::var("LETTERBOX_LOG_LEVEL") {
            self.log_level = log_level;
        }
        if let Ok(url) = std::env::var("LETTERBOX_REGISTRATION_URL") {
            self.registration_url = url;
        }
        if let Some(interval) = std::env::var("LETTERBOX_POLL_INTERVAL_MS")
            .ok()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
        {
            self.poll_interval_ms = interval;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.registration_url, DEFAULT_REGISTRATION_URL);
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.delivery_mode, DeliveryMode::FireAndForget);
        assert_eq!(config.registration_mode, RegistrationMode::Silent);
        assert!(config.store_dir.is_none());
    }

    #[test]
    fn test_config_load_from_file_partial() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(
            &config_path,
            r#"{ "log_level": "debug", "delivery_mode": "confirmed" }"#,
        )
        .unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.delivery_mode, DeliveryMode::Confirmed);
        assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
    }

    #[test]
    fn test_config_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let config = Config {
            registration_mode: RegistrationMode::Strict,
            max_attempts: 9,
            ..Config::default()
        };
        config.save(&paths).unwrap();

        let loaded = Config::load_from_file(&paths.config_file()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_load_nonexistent_uses_defaults() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let config = Config::load(&paths).unwrap();
        assert_eq!(config.delivery_mode, DeliveryMode::FireAndForget);
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = Config {
            poll_interval_ms: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_confirmed_without_attempts() {
        let config = Config {
            delivery_mode: DeliveryMode::Confirmed,
            max_attempts: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_apply_store_dir_override() {
        let config = Config {
            store_dir: Some(PathBuf::from("/var/letterbox")),
            ..Config::default()
        };
        let paths =
            config.apply_to_paths(Paths::with_base_dir(PathBuf::from("/home/x/.letterbox")));
        assert_eq!(paths.store_dir(), Path::new("/var/letterbox"));
    }
}
