//! File and environment configuration.
//!
//! Sources, later ones overriding earlier ones:
//!
//! 1. Built-in defaults (every field has one)
//! 2. An optional YAML file
//! 3. Environment variables prefixed `PAYGATE__`, with `__` separating
//!    nested keys, e.g. `PAYGATE__WEBHOOK__LEGACY_SECRET`
//!
//! A malformed file or a value that cannot be coerced to its field type is an
//! error, as is a configuration that fails [`Settings::validate`].

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::client::{ClientConfig, Environment, RetryPolicy, MAX_REQUEST_TIMEOUT};
use crate::error::{JwksError, SettingsError};
use crate::webhook::jwks::JwksKeyStore;
use crate::webhook::token::TokenDecoderOptions;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "PAYGATE";

/// Complete SDK configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_key: String,
    pub provider_domain: String,
    pub environment: Environment,
    /// Overrides the environment host, for proxies and test servers.
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub webhook: WebhookSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            provider_domain: String::new(),
            environment: Environment::default(),
            base_url: None,
            timeout_secs: MAX_REQUEST_TIMEOUT.as_secs(),
            max_retries: RetryPolicy::default().max_retries,
            retry_delay_ms: RetryPolicy::default().delay.as_millis() as u64,
            webhook: WebhookSettings::default(),
        }
    }
}

/// Notification verification settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookSettings {
    /// Secret for legacy HMAC notifications; legacy bodies are refused when unset.
    pub legacy_secret: Option<String>,
    pub verify_expiration: bool,
    pub leeway_secs: u64,
}

impl Default for WebhookSettings {
    fn default() -> Self {
        let options = TokenDecoderOptions::default();
        Self {
            legacy_secret: None,
            verify_expiration: options.verify_expiration,
            leeway_secs: options.leeway,
        }
    }
}

impl Settings {
    /// Load from defaults, an optional YAML file, then `PAYGATE__*` variables.
    #[instrument]
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            debug!(path = %path.display(), "Loading settings file");
            builder = builder.add_source(
                config::File::from(path)
                    .required(true)
                    .format(config::FileFormat::Yaml),
            );
        }

        let settings: Settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Check required fields and value ranges.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.api_key.trim().is_empty() {
            return Err(SettingsError::Required {
                field: "api_key".to_string(),
            });
        }

        if self.base_url.is_none() {
            if self.provider_domain.trim().is_empty() {
                return Err(SettingsError::Required {
                    field: "provider_domain".to_string(),
                });
            }
            if self.provider_domain.contains('/') || self.provider_domain.contains(':') {
                return Err(SettingsError::InvalidValue {
                    field: "provider_domain".to_string(),
                    message: "expected a bare domain such as 'gateway.example'".to_string(),
                });
            }
        }

        if self.timeout_secs == 0 || self.timeout_secs > MAX_REQUEST_TIMEOUT.as_secs() {
            return Err(SettingsError::InvalidValue {
                field: "timeout_secs".to_string(),
                message: format!(
                    "must be between 1 and {} seconds",
                    MAX_REQUEST_TIMEOUT.as_secs()
                ),
            });
        }

        if matches!(&self.webhook.legacy_secret, Some(secret) if secret.is_empty()) {
            return Err(SettingsError::InvalidValue {
                field: "webhook.legacy_secret".to_string(),
                message: "must not be empty when set".to_string(),
            });
        }

        Ok(())
    }

    /// REST client configuration.
    pub fn client_config(&self) -> ClientConfig {
        let config = ClientConfig::new(self.api_key.clone(), self.provider_domain.clone())
            .with_environment(self.environment)
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_retry_policy(RetryPolicy::new(
                self.max_retries,
                Duration::from_millis(self.retry_delay_ms),
            ));

        match &self.base_url {
            Some(url) => config.with_base_url(url.clone()),
            None => config,
        }
    }

    /// Token verification options. Signature verification is always on.
    pub fn token_options(&self) -> TokenDecoderOptions {
        TokenDecoderOptions {
            verify: true,
            verify_expiration: self.webhook.verify_expiration,
            leeway: self.webhook.leeway_secs,
        }
    }

    /// Signing key store for the configured environment.
    pub fn key_store(&self) -> Result<JwksKeyStore, JwksError> {
        JwksKeyStore::from_client_config(&self.client_config())
    }
}

// Security: keep secrets out of debug output
impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &"<REDACTED>")
            .field("provider_domain", &self.provider_domain)
            .field("environment", &self.environment)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .field("webhook", &self.webhook)
            .finish()
    }
}

impl std::fmt::Debug for WebhookSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookSettings")
            .field(
                "legacy_secret",
                &self.legacy_secret.as_ref().map(|_| "<REDACTED>"),
            )
            .field("verify_expiration", &self.verify_expiration)
            .field("leeway_secs", &self.leeway_secs)
            .finish()
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
