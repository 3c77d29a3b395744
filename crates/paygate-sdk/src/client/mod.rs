//! Payment gateway REST client.
//!
//! The resource wrappers ([`Orders`], [`Refunds`], [`Operations`],
//! [`Subscriptions`]) are thin: each call maps one method to one HTTP verb,
//! path and JSON body. All transport concerns live behind the [`HttpClient`]
//! trait, whose production implementation is [`ReqwestHttpClient`].
//!
//! # Examples
//!
//! ```no_run
//! use paygate_sdk::client::{ClientConfig, Environment, PaygateClient};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::new("api-key", "gateway.example")
//!     .with_environment(Environment::Sandbox);
//! let client = PaygateClient::new(config)?;
//!
//! let order = client
//!     .orders()
//!     .create(&json!({"amount": {"value": "10.00", "currency": "RUB"}}))
//!     .await?;
//! println!("created: {}", order["order_id"]);
//! # Ok(())
//! # }
//! ```

mod operations;
mod orders;
mod refunds;
mod retry;
mod subscriptions;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Method};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::error::ApiError;

pub use operations::Operations;
pub use orders::Orders;
pub use refunds::Refunds;
pub use retry::RetryPolicy;
pub use subscriptions::Subscriptions;

/// Maximum request timeout the gateway honours.
pub const MAX_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Content type sent on every API call.
pub const CONTENT_TYPE: &str = "application/json;charset=UTF-8";

/// Gateway deployment targeted by the client and the webhook key store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Sandbox,
}

impl Environment {
    /// Host name for this environment under the provider domain.
    pub fn host(&self, provider_domain: &str) -> String {
        match self {
            Self::Production => format!("pay.{}", provider_domain),
            Self::Sandbox => format!("sandbox.pay.{}", provider_domain),
        }
    }

    /// HTTPS base URL of the API.
    pub fn base_url(&self, provider_domain: &str) -> String {
        format!("https://{}", self.host(provider_domain))
    }

    /// URL of the published signing key set.
    pub fn jwks_url(&self, provider_domain: &str) -> String {
        format!("{}/api/jwks", self.base_url(provider_domain))
    }
}

/// Configuration for the gateway REST client.
///
/// # Examples
///
/// ```
/// use paygate_sdk::client::{ClientConfig, Environment};
/// use std::time::Duration;
///
/// let config = ClientConfig::new("key", "gateway.example")
///     .with_environment(Environment::Sandbox)
///     .with_timeout(Duration::from_secs(60));
///
/// // The gateway caps requests at 10 seconds.
/// assert_eq!(config.timeout, Duration::from_secs(10));
/// assert_eq!(config.base_url(), "https://sandbox.pay.gateway.example");
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    /// Merchant API key sent as `Authorization: Api-Key <key>`
    pub api_key: String,
    /// Target environment
    pub environment: Environment,
    /// Provider domain the environment hosts live under
    pub provider_domain: String,
    /// Request timeout (never above [`MAX_REQUEST_TIMEOUT`])
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Retry behaviour for transient failures
    pub retry_policy: RetryPolicy,
    /// User agent string for API requests
    pub user_agent: String,
    base_url_override: Option<String>,
}

impl ClientConfig {
    /// Create a configuration for the production environment.
    pub fn new(api_key: impl Into<String>, provider_domain: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            environment: Environment::Production,
            provider_domain: provider_domain.into(),
            timeout: MAX_REQUEST_TIMEOUT,
            connect_timeout: Duration::from_secs(5),
            retry_policy: RetryPolicy::default(),
            user_agent: concat!("paygate-sdk/", env!("CARGO_PKG_VERSION")).to_string(),
            base_url_override: None,
        }
    }

    /// Set the target environment.
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Set the request timeout, clamped to the gateway maximum.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout.min(MAX_REQUEST_TIMEOUT);
        self
    }

    /// Set the retry policy.
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Set the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Send requests to `url` instead of the environment host (proxies, tests).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url_override = Some(url.into());
        self
    }

    /// Effective API base URL.
    pub fn base_url(&self) -> String {
        self.base_url_override
            .clone()
            .unwrap_or_else(|| self.environment.base_url(&self.provider_domain))
    }

    /// URL of the signing key set for the configured environment.
    pub fn jwks_url(&self) -> String {
        match &self.base_url_override {
            Some(base) => format!("{}/api/jwks", base.trim_end_matches('/')),
            None => self.environment.jwks_url(&self.provider_domain),
        }
    }
}

// Security: Don't expose the API key in debug output
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<REDACTED>")
            .field("environment", &self.environment)
            .field("provider_domain", &self.provider_domain)
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("retry_policy", &self.retry_policy)
            .field("base_url", &self.base_url())
            .finish()
    }
}

/// JSON-over-HTTP transport used by the resource wrappers.
///
/// Implementations send the fixed gateway headers, map non-success statuses
/// and transport failures to [`ApiError`], and return the parsed JSON body
/// (`Value::Null` for an empty body).
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Perform one logical API call.
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError>;

    async fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.request(Method::GET, path, None).await
    }

    async fn post(&self, path: &str, body: Option<Value>) -> Result<Value, ApiError> {
        self.request(Method::POST, path, body).await
    }

    async fn put(&self, path: &str, body: Option<Value>) -> Result<Value, ApiError> {
        self.request(Method::PUT, path, body).await
    }

    async fn delete(&self, path: &str) -> Result<Value, ApiError> {
        self.request(Method::DELETE, path, None).await
    }
}

/// [`HttpClient`] backed by `reqwest`, with fixed headers and the retry policy.
#[derive(Clone)]
pub struct ReqwestHttpClient {
    http_client: reqwest::Client,
    config: ClientConfig,
}

impl ReqwestHttpClient {
    /// Build a transport from configuration.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url_for(&self, path: &str) -> Result<url::Url, ApiError> {
        let base = self.config.base_url();
        let joined = format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        url::Url::parse(&joined).map_err(|e| ApiError::InvalidRequest {
            message: format!("Invalid request URL '{}': {}", joined, e),
        })
    }

    async fn send_once(
        &self,
        method: Method,
        url: url::Url,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let mut request = self
            .http_client
            .request(method, url)
            .header(header::CONTENT_TYPE, CONTENT_TYPE)
            .header(header::ACCEPT, "application/json")
            .header(
                header::AUTHORIZATION,
                format!("Api-Key {}", self.config.api_key),
            );

        if let Some(body) = body {
            request = request.body(serde_json::to_vec(body)?);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout
            } else {
                ApiError::Transport(e)
            }
        })?;

        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            return Err(ApiError::HttpError {
                status: status.as_u16(),
                message: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    #[instrument(skip(self, body))]
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let url = self.url_for(path)?;
        let policy = &self.config.retry_policy;
        let mut attempt = 0;

        loop {
            match self.send_once(method.clone(), url.clone(), body.as_ref()).await {
                Ok(value) => {
                    debug!(attempt, "API call succeeded");
                    return Ok(value);
                }
                Err(e) if e.is_transient() && policy.should_retry(attempt) => {
                    attempt += 1;
                    warn!(attempt, error = %e, "Transient API failure, retrying");
                    tokio::time::sleep(policy.calculate_delay(attempt)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl std::fmt::Debug for ReqwestHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestHttpClient")
            .field("config", &self.config)
            .finish()
    }
}

/// Entry point to the gateway REST resources.
#[derive(Clone)]
pub struct PaygateClient {
    http: Arc<dyn HttpClient>,
}

impl PaygateClient {
    /// Create a client using the `reqwest` transport.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        Ok(Self::with_http_client(Arc::new(ReqwestHttpClient::new(
            config,
        )?)))
    }

    /// Create a client over a custom transport.
    pub fn with_http_client(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }

    /// Order operations.
    pub fn orders(&self) -> Orders {
        Orders::new(self.http.clone())
    }

    /// Refund operations.
    pub fn refunds(&self) -> Refunds {
        Refunds::new(self.http.clone())
    }

    /// Operation queries.
    pub fn operations(&self) -> Operations {
        Operations::new(self.http.clone())
    }

    /// Subscription operations.
    pub fn subscriptions(&self) -> Subscriptions {
        Subscriptions::new(self.http.clone())
    }
}

/// Serialize a request body for transport.
pub(crate) fn to_body<B: Serialize + ?Sized>(body: &B) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::InvalidRequest {
        message: format!("Request body is not serializable: {}", e),
    })
}

/// Validate an identifier before interpolating it into a path.
pub(crate) fn path_id(id: &str) -> Result<&str, ApiError> {
    if id.is_empty() || id.contains(['/', '?', '#']) {
        return Err(ApiError::InvalidRequest {
            message: format!("Invalid resource identifier: '{}'", id),
        });
    }
    Ok(id)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
