//! Compact signed-token decoding for modern notifications.
//!
//! Modern notifications arrive as `header.payload.signature` tokens signed
//! with ES256. [`TokenDecoder`] has two paths, selected by
//! [`TokenDecoderOptions::verify`]:
//!
//! - **Verified** (default): read `kid` from the header, resolve the key,
//!   require `alg == "ES256"`, check the signature and (unless disabled) the
//!   `exp` claim.
//! - **Unverified**: decode header and payload without looking at the
//!   signature. Diagnostic tooling only.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, Validation};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};
use tracing::{debug, instrument, warn};

use super::jwks::KeyResolver;
use crate::error::TokenError;

/// The only signature algorithm accepted on the verified path.
pub const REQUIRED_ALGORITHM: &str = "ES256";

/// Decoding behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenDecoderOptions {
    /// Verify the signature (disable only for diagnostics)
    pub verify: bool,
    /// Reject tokens whose `exp` claim is in the past
    pub verify_expiration: bool,
    /// Clock skew tolerance for `exp`, in seconds
    pub leeway: u64,
}

impl Default for TokenDecoderOptions {
    fn default() -> Self {
        Self {
            verify: true,
            verify_expiration: true,
            leeway: 0,
        }
    }
}

impl TokenDecoderOptions {
    /// Options for the unverified diagnostic path.
    pub fn unverified() -> Self {
        Self {
            verify: false,
            ..Self::default()
        }
    }

    /// Disable `exp` checking on the verified path.
    pub fn without_expiration(mut self) -> Self {
        self.verify_expiration = false;
        self
    }

    /// Set the clock skew tolerance.
    pub fn with_leeway(mut self, leeway: u64) -> Self {
        self.leeway = leeway;
        self
    }
}

/// Decodes one compact token.
///
/// The header is parsed lazily on first access and cached for the life of
/// the decoder; reading it never needs the signature.
///
/// # Examples
///
/// ```no_run
/// use paygate_sdk::webhook::{JwksKeyStore, TokenDecoder, TokenDecoderOptions};
/// use std::sync::Arc;
///
/// # async fn example(body: String) -> Result<(), Box<dyn std::error::Error>> {
/// let store = Arc::new(JwksKeyStore::new("https://pay.gateway.example/api/jwks")?);
/// let decoder = TokenDecoder::new(body, store, TokenDecoderOptions::default());
///
/// let payload = decoder.decode().await?;
/// println!("event: {}", payload["event"]);
/// # Ok(())
/// # }
/// ```
pub struct TokenDecoder {
    token: String,
    options: TokenDecoderOptions,
    resolver: Option<Arc<dyn KeyResolver>>,
    header: OnceLock<Result<Map<String, Value>, String>>,
}

impl TokenDecoder {
    /// Create a decoder that resolves keys through `resolver`.
    pub fn new(
        token: impl Into<String>,
        resolver: Arc<dyn KeyResolver>,
        options: TokenDecoderOptions,
    ) -> Self {
        Self {
            token: token.into().trim().to_string(),
            options,
            resolver: Some(resolver),
            header: OnceLock::new(),
        }
    }

    /// Create a decoder for the unverified diagnostic path.
    pub fn unverified(token: impl Into<String>) -> Self {
        Self {
            token: token.into().trim().to_string(),
            options: TokenDecoderOptions::unverified(),
            resolver: None,
            header: OnceLock::new(),
        }
    }

    /// The raw token text.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Options in effect.
    pub fn options(&self) -> TokenDecoderOptions {
        self.options
    }

    /// The decoded header.
    pub fn header(&self) -> Result<&Map<String, Value>, TokenError> {
        self.header
            .get_or_init(|| {
                let (header, _, _) = split_segments(&self.token).map_err(into_message)?;
                decode_json_object(header, "header").map_err(into_message)
            })
            .as_ref()
            .map_err(|message| TokenError::InvalidToken {
                message: message.clone(),
            })
    }

    /// The header's `kid`, if present.
    pub fn key_id(&self) -> Result<Option<&str>, TokenError> {
        Ok(self.header()?.get("kid").and_then(Value::as_str))
    }

    /// The header's `alg`, if present.
    pub fn algorithm(&self) -> Result<Option<&str>, TokenError> {
        Ok(self.header()?.get("alg").and_then(Value::as_str))
    }

    /// Decode the payload along the path selected by the options.
    ///
    /// # Errors
    ///
    /// - [`TokenError::InvalidToken`] for malformed structure, a disallowed
    ///   algorithm or a missing `kid`
    /// - [`TokenError::UnknownKey`] when no cached key matches `kid`
    /// - [`TokenError::InvalidSignature`] when the signature does not verify
    /// - [`TokenError::TokenExpired`] when `exp` has passed
    /// - [`TokenError::Jwks`] when the key set could not be fetched
    pub async fn decode(&self) -> Result<Value, TokenError> {
        if self.options.verify {
            self.decode_verified().await
        } else {
            self.decode_unverified()
        }
    }

    /// Decode header and payload without checking the signature.
    pub fn decode_unverified(&self) -> Result<Value, TokenError> {
        self.header()?;
        let (_, payload, _) = split_segments(&self.token)?;
        decode_json_object(payload, "payload").map(Value::Object)
    }

    #[instrument(skip(self))]
    async fn decode_verified(&self) -> Result<Value, TokenError> {
        let algorithm = self.algorithm()?;
        if algorithm != Some(REQUIRED_ALGORITHM) {
            warn!(alg = ?algorithm, "Rejecting token with disallowed algorithm");
            return Err(TokenError::InvalidToken {
                message: format!(
                    "unsupported signing algorithm '{}', expected {}",
                    algorithm.unwrap_or("<missing>"),
                    REQUIRED_ALGORITHM
                ),
            });
        }

        let kid = self.key_id()?.ok_or_else(|| TokenError::InvalidToken {
            message: "token header has no kid".to_string(),
        })?;

        let resolver = self
            .resolver
            .as_ref()
            .ok_or_else(|| TokenError::InvalidToken {
                message: "no key resolver configured for verified decoding".to_string(),
            })?;
        let key = resolver.resolve(kid).await?;

        let mut validation = Validation::new(Algorithm::ES256);
        validation.validate_exp = self.options.verify_expiration;
        validation.leeway = self.options.leeway;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        let data = jsonwebtoken::decode::<Value>(self.token.as_str(), &key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::TokenExpired,
                _ => TokenError::InvalidToken {
                    message: e.to_string(),
                },
            })?;

        debug!(kid = %kid, "Token signature verified");
        Ok(data.claims)
    }
}

impl std::fmt::Debug for TokenDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenDecoder")
            .field("options", &self.options)
            .field("token_len", &self.token.len())
            .finish()
    }
}

/// True when `body` has the shape of a compact token rather than a JSON document.
pub fn looks_like_token(body: &str) -> bool {
    let body = body.trim();
    !body.starts_with('{') && body.split('.').count() == 3
}

fn into_message(e: TokenError) -> String {
    match e {
        TokenError::InvalidToken { message } => message,
        other => other.to_string(),
    }
}

fn split_segments(token: &str) -> Result<(&str, &str, &str), TokenError> {
    let mut parts = token.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(payload), Some(signature), None)
            if !header.is_empty() && !payload.is_empty() =>
        {
            Ok((header, payload, signature))
        }
        _ => Err(TokenError::InvalidToken {
            message: "token must have three dot-separated segments".to_string(),
        }),
    }
}

fn decode_json_object(segment: &str, name: &str) -> Result<Map<String, Value>, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|e| TokenError::InvalidToken {
            message: format!("{} is not valid base64url: {}", name, e),
        })?;

    match serde_json::from_slice(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(TokenError::InvalidToken {
            message: format!("{} is not a JSON object", name),
        }),
        Err(e) => Err(TokenError::InvalidToken {
            message: format!("{} is not valid JSON: {}", name, e),
        }),
    }
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
