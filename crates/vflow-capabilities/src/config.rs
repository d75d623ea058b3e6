//! Capability client configuration.

use std::time::Duration;

/// Configuration for the capability client.
#[derive(Debug, Clone)]
pub struct CapabilityClientConfig {
    /// Base URL of the capability service
    pub base_url: String,
    /// Per-request timeout. `None` leaves requests unbounded.
    pub timeout: Option<Duration>,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Chat webhook for pipeline notifications
    pub notify_webhook_url: Option<String>,
}

impl Default for CapabilityClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            timeout: None,
            connect_timeout: Duration::from_secs(10),
            notify_webhook_url: None,
        }
    }
}

impl CapabilityClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            base_url: std::env::var("CAPABILITY_BASE_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            timeout: std::env::var("CAPABILITY_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs),
            connect_timeout: Duration::from_secs(
                std::env::var("CAPABILITY_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
            notify_webhook_url: std::env::var("NOTIFY_WEBHOOK_URL")
                .ok()
                .filter(|s| !s.trim().is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_config_defaults() {
        let config = CapabilityClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:3000/api");
        assert!(config.timeout.is_none());
        assert!(config.notify_webhook_url.is_none());
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        std::env::set_var("CAPABILITY_BASE_URL", "https://media.test/api/");
        std::env::set_var("CAPABILITY_TIMEOUT_SECS", "90");
        std::env::remove_var("NOTIFY_WEBHOOK_URL");

        let config = CapabilityClientConfig::from_env();
        assert_eq!(config.base_url, "https://media.test/api");
        assert_eq!(config.timeout, Some(Duration::from_secs(90)));
        assert!(config.notify_webhook_url.is_none());

        std::env::remove_var("CAPABILITY_BASE_URL");
        std::env::remove_var("CAPABILITY_TIMEOUT_SECS");
    }
}
