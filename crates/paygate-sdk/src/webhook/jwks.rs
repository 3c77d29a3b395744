//! Signing key retrieval for token-delivered notifications.
//!
//! The gateway publishes its ES256 verification keys as a JSON Web Key Set.
//! [`JwksKeyStore`] fetches that set, keeps it for [`JWKS_CACHE_TTL_SECS`]
//! seconds and resolves keys by `kid`.
//!
//! # Caching
//!
//! - A successful fetch replaces the whole cached set; sets are never merged.
//! - A resolve call reuses the cache only while it is younger than the TTL.
//!   Otherwise it re-fetches inline before resolving. There is no background
//!   refresh.
//! - Clones of a store share one cache, so a single store cloned into every
//!   request handler gives process-wide sharing.
//! - Concurrent resolves that all find the cache stale may each fetch. The
//!   last fetch to finish wins. Key sets from one endpoint are expected to be
//!   consistent, so whichever set lands is acceptable.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::jwk::Jwk;
use jsonwebtoken::DecodingKey;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::client::{ClientConfig, Environment};
use crate::error::JwksError;

/// Maximum age of a cached key set.
pub const JWKS_CACHE_TTL_SECS: i64 = 3600;

/// Connect timeout for the key set endpoint.
pub const JWKS_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Read timeout for the key set endpoint.
pub const JWKS_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of the current time, replaceable in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Resolves a token's `kid` to a verification key.
///
/// [`JwksKeyStore`] is the production implementation; tests substitute a
/// static resolver.
#[async_trait]
pub trait KeyResolver: Send + Sync {
    /// Find the verification key for `kid`.
    ///
    /// # Errors
    ///
    /// - [`JwksError::KeyNotFound`] when no key carries that id
    /// - [`JwksError::Fetch`] / [`JwksError::HttpStatus`] / [`JwksError::Parse`]
    ///   when the key set had to be fetched and that failed
    async fn resolve(&self, kid: &str) -> Result<DecodingKey, JwksError>;
}

/// A fetched set of verification keys, indexed by key id.
pub struct SigningKeySet {
    keys: HashMap<String, DecodingKey>,
    fetched_at: DateTime<Utc>,
}

impl SigningKeySet {
    /// Parse a JWKS document.
    ///
    /// Entries without a `kid` or whose key material cannot be used are
    /// skipped with a warning. A document that yields no usable key is an
    /// error.
    pub fn from_jwks_json(body: &[u8], fetched_at: DateTime<Utc>) -> Result<Self, JwksError> {
        let document: Value = serde_json::from_slice(body).map_err(|e| JwksError::Parse {
            message: format!("body is not valid JSON: {}", e),
        })?;

        let entries = document
            .get("keys")
            .and_then(Value::as_array)
            .ok_or_else(|| JwksError::Parse {
                message: "document has no 'keys' list".to_string(),
            })?;

        let mut keys = HashMap::with_capacity(entries.len());
        for entry in entries {
            let jwk: Jwk = match serde_json::from_value(entry.clone()) {
                Ok(jwk) => jwk,
                Err(e) => {
                    warn!(error = %e, "Skipping unparsable JWK entry");
                    continue;
                }
            };

            let Some(kid) = jwk.common.key_id.clone() else {
                warn!("Skipping JWK entry without kid");
                continue;
            };

            match DecodingKey::from_jwk(&jwk) {
                Ok(key) => {
                    keys.insert(kid, key);
                }
                Err(e) => warn!(kid = %kid, error = %e, "Skipping unusable JWK entry"),
            }
        }

        if keys.is_empty() {
            return Err(JwksError::Parse {
                message: "key list is empty".to_string(),
            });
        }

        Ok(Self { keys, fetched_at })
    }

    /// Look up a key by id.
    pub fn key(&self, kid: &str) -> Option<&DecodingKey> {
        self.keys.get(kid)
    }

    /// Key ids in this set.
    pub fn key_ids(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }

    /// Number of usable keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// When this set was fetched.
    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// True while the set is younger than `ttl`.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now - self.fetched_at < ttl
    }
}

impl std::fmt::Debug for SigningKeySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kids: Vec<&str> = self.key_ids().collect();
        kids.sort_unstable();
        f.debug_struct("SigningKeySet")
            .field("kids", &kids)
            .field("fetched_at", &self.fetched_at)
            .finish()
    }
}

/// Fetches and caches the gateway's signing keys.
///
/// # Examples
///
/// ```no_run
/// use paygate_sdk::client::Environment;
/// use paygate_sdk::webhook::{JwksKeyStore, KeyResolver};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = JwksKeyStore::for_environment(Environment::Sandbox, "gateway.example")?;
///
/// // First call fetches, later calls within the hour hit the cache.
/// let key = store.resolve("2024-key-1").await?;
/// # let _ = key;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct JwksKeyStore {
    http_client: reqwest::Client,
    jwks_url: String,
    ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
    cache: Arc<RwLock<Option<Arc<SigningKeySet>>>>,
}

impl JwksKeyStore {
    /// Create a store for an explicit key set URL.
    pub fn new(jwks_url: impl Into<String>) -> Result<Self, JwksError> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(JWKS_CONNECT_TIMEOUT)
            .read_timeout(JWKS_READ_TIMEOUT)
            .build()
            .map_err(|e| JwksError::Fetch {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            http_client,
            jwks_url: jwks_url.into(),
            ttl: chrono::Duration::seconds(JWKS_CACHE_TTL_SECS),
            clock: Arc::new(SystemClock),
            cache: Arc::new(RwLock::new(None)),
        })
    }

    /// Create a store for the key set of a gateway environment.
    pub fn for_environment(
        environment: Environment,
        provider_domain: &str,
    ) -> Result<Self, JwksError> {
        Self::new(environment.jwks_url(provider_domain))
    }

    /// Create a store matching a REST client configuration.
    pub fn from_client_config(config: &ClientConfig) -> Result<Self, JwksError> {
        Self::new(config.jwks_url())
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// URL the key set is fetched from.
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Fetch the key set without touching the cache.
    #[instrument(skip(self), fields(url = %self.jwks_url))]
    pub async fn fetch(&self) -> Result<SigningKeySet, JwksError> {
        let response = self
            .http_client
            .get(&self.jwks_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| JwksError::Fetch {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "JWKS endpoint returned an error status");
            return Err(JwksError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| JwksError::Fetch {
            message: format!("failed to read body: {}", e),
        })?;

        SigningKeySet::from_jwks_json(&body, self.clock.now())
    }

    /// Fetch the key set and replace the cache with it.
    pub async fn refresh(&self) -> Result<Arc<SigningKeySet>, JwksError> {
        let key_set = Arc::new(self.fetch().await?);
        info!(keys = key_set.len(), "Signing key set refreshed");

        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        *cache = Some(key_set.clone());

        Ok(key_set)
    }

    /// Drop the cached key set so the next resolve fetches.
    pub fn invalidate(&self) {
        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        *cache = None;
    }

    /// The cached key set, if any, regardless of age.
    pub fn cached(&self) -> Option<Arc<SigningKeySet>> {
        self.cache
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn fresh_cached(&self) -> Option<Arc<SigningKeySet>> {
        let now = self.clock.now();
        self.cached().filter(|set| set.is_fresh(now, self.ttl))
    }
}

#[async_trait]
impl KeyResolver for JwksKeyStore {
    #[instrument(skip(self))]
    async fn resolve(&self, kid: &str) -> Result<DecodingKey, JwksError> {
        let key_set = match self.fresh_cached() {
            Some(set) => {
                debug!("Signing key cache hit");
                set
            }
            None => {
                debug!("Signing key cache missing or stale, fetching");
                self.refresh().await?
            }
        };

        key_set
            .key(kid)
            .cloned()
            .ok_or_else(|| JwksError::KeyNotFound {
                kid: kid.to_string(),
            })
    }
}

impl std::fmt::Debug for JwksKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwksKeyStore")
            .field("jwks_url", &self.jwks_url)
            .field("ttl", &self.ttl)
            .field("cached", &self.cached())
            .finish()
    }
}

#[cfg(test)]
#[path = "jwks_tests.rs"]
mod tests;
