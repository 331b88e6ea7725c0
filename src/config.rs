//! Pipeline configuration
//!
//! Timeouts, concurrency, and quota windows are policy knobs, read
//! from the environment with conservative defaults.

use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Upper bound on a single connector attempt.
    pub per_call_timeout: Duration,
    /// Upper bound on the whole gather phase of one request.
    pub global_deadline: Duration,
    /// Concurrent (pillar, category) fetches per request.
    pub fetch_concurrency: usize,
    /// Wait before the single intent-resolution retry.
    pub intent_retry_backoff: Duration,
    /// Rolling per-provider quota: requests allowed per window.
    pub provider_window_limit: usize,
    pub provider_window: Duration,
    /// Calendar lookback for price and sector series.
    pub price_lookback_days: i64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            per_call_timeout: Duration::from_millis(10_000),
            global_deadline: Duration::from_millis(30_000),
            fetch_concurrency: 8,
            intent_retry_backoff: Duration::from_millis(500),
            provider_window_limit: 60,
            provider_window: Duration::from_secs(60),
            price_lookback_days: 180,
        }
    }
}

impl PipelineConfig {
    /// Read overrides from the environment, falling back to defaults
    /// for anything unset or unparseable.
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            per_call_timeout: env_millis("PER_CALL_TIMEOUT_MS").unwrap_or(base.per_call_timeout),
            global_deadline: env_millis("GLOBAL_DEADLINE_MS").unwrap_or(base.global_deadline),
            fetch_concurrency: env_parse("FETCH_CONCURRENCY").unwrap_or(base.fetch_concurrency),
            intent_retry_backoff: env_millis("INTENT_RETRY_BACKOFF_MS")
                .unwrap_or(base.intent_retry_backoff),
            provider_window_limit: env_parse("PROVIDER_WINDOW_LIMIT")
                .unwrap_or(base.provider_window_limit),
            provider_window: env_parse("PROVIDER_WINDOW_SECS")
                .map(Duration::from_secs)
                .unwrap_or(base.provider_window),
            price_lookback_days: env_parse("PRICE_LOOKBACK_DAYS").unwrap_or(base.price_lookback_days),
        }
    }
}

fn env_millis(key: &str) -> Option<Duration> {
    env_parse(key).map(Duration::from_millis)
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.per_call_timeout, Duration::from_secs(10));
        assert_eq!(config.global_deadline, Duration::from_secs(30));
        assert_eq!(config.fetch_concurrency, 8);
        assert_eq!(config.provider_window_limit, 60);
    }

    #[test]
    fn test_env_overrides() {
        // All env assertions live in one test so they cannot race each
        // other under the parallel test runner.
        env::set_var("PER_CALL_TIMEOUT_MS", "1500");
        env::set_var("FETCH_CONCURRENCY", "3");
        env::set_var("PROVIDER_WINDOW_SECS", "not-a-number");

        let config = PipelineConfig::from_env();
        assert_eq!(config.per_call_timeout, Duration::from_millis(1500));
        assert_eq!(config.fetch_concurrency, 3);
        assert_eq!(config.provider_window, Duration::from_secs(60));

        env::remove_var("PER_CALL_TIMEOUT_MS");
        env::remove_var("FETCH_CONCURRENCY");
        env::remove_var("PROVIDER_WINDOW_SECS");
    }
}
