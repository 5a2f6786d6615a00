//! Logging initialization for Letterbox processes.
//!
//! Thin wrappers over the observability crate. Every process writes
//! structured JSONL to `~/.letterbox/logs/letterbox.jsonl` unless a custom
//! [`Paths`](crate::Paths) layout says otherwise.

use crate::Paths;

/// Initialize logging with a custom service name.
///
/// When `paths` is given, the log file lives under its base directory.
pub fn init_logging_for_service(service_name: &str, level: &str, paths: Option<&Paths>) {
    observability::init_with_config(observability::LogConfig {
        service_name: service_name.into(),
        default_level: level.into(),
        log_path: paths.map(Paths::log_file),
        also_stderr: true,
        ..Default::default()
    });
}
