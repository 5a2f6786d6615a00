//! Worker configuration and retry backoff.

use chrono::{DateTime, Utc};
use letterbox_config_and_utils::{Config, DeliveryMode};
use std::time::Duration;

/// How record status relates to delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryPolicy {
    /// Mark `sent` before delivering. Drops and errors are never retried.
    #[default]
    FireAndForget,
    /// Mark `attempted` before delivering and `delivered` after a successful
    /// write. Undelivered records are retried with exponential backoff and
    /// marked `failed` after `max_attempts`.
    Confirmed {
        max_attempts: u32,
        backoff_base: Duration,
        backoff_max: Duration,
    },
}

/// Configuration for the outbound worker.
///
/// Retry delay under [`DeliveryPolicy::Confirmed`] follows
/// `base * 2^(attempts - 1)` capped at `backoff_max`:
/// - after 1st attempt: 2s
/// - after 2nd attempt: 4s
/// - after 3rd attempt: 8s
/// - ... up to 300s
#[derive(Debug, Clone)]
pub struct OutboundWorkerConfig {
    /// Time between processing passes.
    pub poll_interval: Duration,
    pub policy: DeliveryPolicy,
}

impl Default for OutboundWorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            policy: DeliveryPolicy::FireAndForget,
        }
    }
}

impl From<&Config> for OutboundWorkerConfig {
    fn from(config: &Config) -> Self {
        let policy = match config.delivery_mode {
            DeliveryMode::FireAndForget => DeliveryPolicy::FireAndForget,
            DeliveryMode::Confirmed => DeliveryPolicy::Confirmed {
                max_attempts: config.max_attempts,
                backoff_base: Duration::from_millis(config.backoff_base_ms),
                backoff_max: Duration::from_millis(config.backoff_max_ms),
            },
        };
        Self {
            poll_interval: config.poll_interval(),
            policy,
        }
    }
}

/// Whether a record attempted `attempts` times, last at `last_attempt`, is due again.
pub(crate) fn is_due(
    last_attempt: DateTime<Utc>,
    attempts: u32,
    now: DateTime<Utc>,
    backoff_base: Duration,
    backoff_max: Duration,
) -> bool {
    now >= last_attempt + compute_backoff(attempts, backoff_base, backoff_max)
}

/// Exponential backoff for the given number of prior attempts.
pub(crate) fn compute_backoff(
    attempts: u32,
    backoff_base: Duration,
    backoff_max: Duration,
) -> chrono::Duration {
    if attempts == 0 {
        return chrono::Duration::zero();
    }

    let base_ms = backoff_base.as_millis() as u64;
    let max_ms = backoff_max.as_millis() as u64;
    let shift = attempts.saturating_sub(1);
    let multiplier = 1u64.checked_shl(shift).unwrap_or(u64::MAX);
    let delay_ms = base_ms.saturating_mul(multiplier).min(max_ms);

    chrono::Duration::milliseconds(delay_ms as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_backoff_caps_and_grows() {
        let base = Duration::from_secs(2);
        let max = Duration::from_secs(10);

        assert_eq!(compute_backoff(0, base, max), chrono::Duration::zero());
        assert_eq!(compute_backoff(1, base, max), chrono::Duration::seconds(2));
        assert_eq!(compute_backoff(2, base, max), chrono::Duration::seconds(4));
        assert_eq!(compute_backoff(3, base, max), chrono::Duration::seconds(8));
        assert_eq!(compute_backoff(4, base, max), chrono::Duration::seconds(10));
        assert_eq!(compute_backoff(200, base, max), chrono::Duration::seconds(10));
    }

    #[test]
    fn is_due_respects_backoff() {
        let base = Duration::from_secs(2);
        let max = Duration::from_secs(10);
        let now = Utc::now();

        assert!(is_due(now, 0, now, base, max));
        assert!(!is_due(now, 1, now, base, max));
        assert!(is_due(now, 1, now + chrono::Duration::seconds(2), base, max));
    }

    #[test]
    fn default_is_fire_and_forget_every_second() {
        let config = OutboundWorkerConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.policy, DeliveryPolicy::FireAndForget);
    }

    #[test]
    fn from_config_maps_confirmed_mode() {
        let config = Config {
            delivery_mode: DeliveryMode::Confirmed,
            max_attempts: 3,
            backoff_base_ms: 100,
            backoff_max_ms: 1_000,
            poll_interval_ms: 50,
            ..Config::default()
        };
        let worker_config = OutboundWorkerConfig::from(&config);
        assert_eq!(worker_config.poll_interval, Duration::from_millis(50));
        assert_eq!(
            worker_config.policy,
            DeliveryPolicy::Confirmed {
                max_attempts: 3,
                backoff_base: Duration::from_millis(100),
                backoff_max: Duration::from_millis(1_000),
            }
        );
    }
}
