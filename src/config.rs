use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{FlexClientError, Result};

/// Main configuration structure for the flex resource client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub twilio: TwilioConfig,
    pub retry: RetryConfig,
    pub http: HttpConfig,
}

/// Account credentials and the resource containers every wrapper reads.
///
/// Injected explicitly instead of read from process environment inside each
/// wrapper, so concurrent clients can point at different workspaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    /// TaskRouter workspace containing the queues and workers
    pub workspace_sid: String,
    /// Sync service containing the documents
    pub sync_service_sid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_base: f64,
    pub jitter_factor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            twilio: TwilioConfig {
                account_sid: String::new(),
                auth_token: String::new(),
                workspace_sid: String::new(),
                sync_service_sid: String::new(),
            },
            retry: RetryConfig::default(),
            http: HttpConfig {
                timeout_seconds: 30,
            },
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 250,
            max_delay_ms: 10_000,
            backoff_base: 2.0,
            jitter_factor: 0.2,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Config {
    /// Load configuration from file with environment variable overrides.
    /// Always returns a config; credential validation happens in
    /// `FlexClient::new` so tests can build partial configs.
    pub fn load() -> Self {
        // .env location depends on where the hosting process runs from
        let env_paths = ["../.env", ".env"];

        let mut env_loaded = false;
        for path in &env_paths {
            if dotenvy::from_path(path).is_ok() {
                tracing::info!("Loaded .env from: {}", path);
                env_loaded = true;
                break;
            }
        }

        if !env_loaded {
            tracing::debug!("No .env file found - continuing with process env vars only");
        }

        let config_path =
            env::var("FLEX_CLIENT_CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            match fs::read_to_string(&config_path) {
                Ok(contents) => match serde_yaml::from_str::<Config>(&contents) {
                    Ok(config) => {
                        tracing::info!("Loaded configuration from {}", config_path);
                        config
                    }
                    Err(e) => {
                        tracing::error!(
                            "Failed to parse config file {}: {} - using defaults",
                            config_path,
                            e
                        );
                        Self::default()
                    }
                },
                Err(e) => {
                    tracing::error!(
                        "Failed to read config file {}: {} - using defaults",
                        config_path,
                        e
                    );
                    Self::default()
                }
            }
        } else {
            tracing::debug!("Config file not found at {} - using defaults", config_path);
            Self::default()
        };

        config.apply_env_overrides();
        config
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(sid) = env::var("TWILIO_ACCOUNT_SID") {
            self.twilio.account_sid = sid;
        }
        if let Ok(token) = env::var("TWILIO_AUTH_TOKEN") {
            self.twilio.auth_token = token;
        }
        if let Ok(sid) = env::var("TWILIO_FLEX_WORKSPACE_SID") {
            self.twilio.workspace_sid = sid;
        }
        if let Ok(sid) = env::var("TWILIO_FLEX_SYNC_SID") {
            self.twilio.sync_service_sid = sid;
        }

        // Retry overrides
        if let Ok(attempts) = env::var("FLEX_RETRY_MAX_ATTEMPTS") {
            if let Ok(val) = attempts.parse() {
                self.retry.max_attempts = val;
            }
        }
        if let Ok(delay) = env::var("FLEX_RETRY_INITIAL_DELAY_MS") {
            if let Ok(val) = delay.parse() {
                self.retry.initial_delay_ms = val;
            }
        }
        if let Ok(delay) = env::var("FLEX_RETRY_MAX_DELAY_MS") {
            if let Ok(val) = delay.parse() {
                self.retry.max_delay_ms = val;
            }
        }
        if let Ok(base) = env::var("FLEX_RETRY_BACKOFF_BASE") {
            if let Ok(val) = base.parse() {
                self.retry.backoff_base = val;
            }
        }
        if let Ok(jitter) = env::var("FLEX_RETRY_JITTER_FACTOR") {
            if let Ok(val) = jitter.parse() {
                self.retry.jitter_factor = val;
            }
        }

        if let Ok(timeout) = env::var("FLEX_HTTP_TIMEOUT_SECONDS") {
            if let Ok(val) = timeout.parse() {
                self.http.timeout_seconds = val;
            }
        }
    }

    /// Validate that the config can reach the platform
    pub fn validate(&self) -> Result<()> {
        if self.twilio.account_sid.is_empty() {
            return Err(FlexClientError::Config(
                "account_sid must be set (TWILIO_ACCOUNT_SID)".to_string(),
            ));
        }
        if self.twilio.auth_token.is_empty() {
            return Err(FlexClientError::Config(
                "auth_token must be set (TWILIO_AUTH_TOKEN)".to_string(),
            ));
        }
        if self.twilio.workspace_sid.is_empty() {
            return Err(FlexClientError::Config(
                "workspace_sid must be set (TWILIO_FLEX_WORKSPACE_SID)".to_string(),
            ));
        }
        if self.twilio.sync_service_sid.is_empty() {
            return Err(FlexClientError::Config(
                "sync_service_sid must be set (TWILIO_FLEX_SYNC_SID)".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(FlexClientError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.retry.backoff_base < 1.0 {
            return Err(FlexClientError::Config(
                "retry.backoff_base must be >= 1.0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated() -> Config {
        Config {
            twilio: TwilioConfig {
                account_sid: "AC00000000000000000000000000000000".to_string(),
                auth_token: "secret".to_string(),
                workspace_sid: "WS00000000000000000000000000000000".to_string(),
                sync_service_sid: "IS00000000000000000000000000000000".to_string(),
            },
            ..Config::default()
        }
    }

    #[test]
    fn default_retry_values() {
        let retry = RetryConfig::default();
        assert_eq!(retry.max_attempts, 3);
        assert_eq!(retry.initial_delay_ms, 250);
        assert_eq!(retry.max_delay_ms, 10_000);
        assert!(retry.backoff_base > 1.0);
    }

    #[test]
    fn validate_accepts_populated_config() {
        assert!(populated().validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_credentials() {
        let mut config = populated();
        config.twilio.auth_token.clear();
        assert!(config.validate().is_err());

        let mut config = populated();
        config.twilio.workspace_sid.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_attempt_budget() {
        let mut config = populated();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());
    }
}
