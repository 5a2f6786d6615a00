//! # Observability
//!
//! Centralized logging layer for Letterbox services.
//!
//! Services call [`init_with_config`] once at startup and use
//! standard `tracing` macros everywhere else. Library crates never install a
//! subscriber themselves.
//!
//! All output goes to a structured JSONL file, by default
//! `~/.letterbox/logs/letterbox.jsonl`:
//!
//! - `tail -f ~/.letterbox/logs/letterbox.jsonl | jq` for pretty JSON
//! - `lnav ~/.letterbox/logs/letterbox.jsonl` for interactive exploration
//!
//! Several client processes on one host may append to the same file, so the
//! writer flushes after every line.
//!
//! ```rust,ignore
//! fn main() {
//!     observability::init_with_config(observability::LogConfig {
//!         service_name: "letterbox".into(),
//!         default_level: "debug".into(),
//!         also_stderr: true,
//!         ..Default::default()
//!     });
//!     tracing::info!("client started");
//! }
//! ```

mod dev;
mod json_layer;

use std::path::PathBuf;

pub use dev::CentralLogWriter;
pub use json_layer::LogEntry;

/// Format of the optional stderr layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StderrFormat {
    /// Compact single-line human output.
    #[default]
    Compact,
    /// One JSON object per line.
    Json,
}

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service (e.g., "letterbox", "letterbox-run").
    /// Included in every log line for filtering.
    pub service_name: String,

    /// Default log level filter (e.g., "debug", "info", "warn").
    /// Can be overridden by `RUST_LOG` environment variable.
    pub default_level: String,

    /// Optional custom log file path.
    /// Defaults to `~/.letterbox/logs/letterbox.jsonl`.
    pub log_path: Option<PathBuf>,

    /// Also emit logs to stderr for immediate feedback.
    pub also_stderr: bool,

    /// Format used for the stderr layer.
    pub stderr_format: StderrFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
            stderr_format: StderrFormat::Compact,
        }
    }
}

/// Initialize the logging layer with custom configuration.
///
/// If the log file cannot be opened the subscriber falls back to stderr only,
/// so a read-only home directory never prevents a client from starting.
pub fn init_with_config(config: LogConfig) {
    dev::init_subscriber(&config);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.service_name, "unknown");
        assert_eq!(config.default_level, "info");
        assert!(config.log_path.is_none());
        assert!(!config.also_stderr);
        assert_eq!(config.stderr_format, StderrFormat::Compact);
    }
}
