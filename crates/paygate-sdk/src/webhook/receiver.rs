//! Notification intake: verify, parse, acknowledge, dispatch.
//!
//! The receiver picks the verification path from the body itself:
//!
//! 1. A compact `header.payload.signature` body is a modern notification. It
//!    is decoded with [`TokenDecoder`], which resolves the signing key through
//!    the configured [`KeyResolver`].
//! 2. Anything else is treated as a legacy JSON notification. Its HMAC is
//!    checked against the `X-Signature` header over the exact bytes received,
//!    before the body is parsed or any key is normalized.
//!
//! Only a notification that survives both verification and parsing is
//! acknowledged with 200. Every failure maps to a non-2xx status so the
//! provider redelivers. Handlers run after the response is produced.
//!
//! # Examples
//!
//! ```rust,no_run
//! use paygate_sdk::webhook::{
//!     JwksKeyStore, NotificationReceiver, NotificationRequest, TokenDecoderOptions,
//! };
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let keys = Arc::new(JwksKeyStore::new("https://pay.gateway.example/api/jwks")?);
//! let receiver = NotificationReceiver::new(keys, TokenDecoderOptions::default())
//!     .with_legacy_secret("legacy-secret");
//!
//! let request = NotificationRequest::new(HashMap::new(), bytes::Bytes::from_static(b"a.b.c"));
//! let response = receiver.receive(request).await;
//! println!("Status: {}", response.status_code());
//! # Ok(())
//! # }
//! ```

use crate::error::{NotificationError, TokenError, WebhookError};
use crate::webhook::handler::NotificationHandler;
use crate::webhook::jwks::KeyResolver;
use crate::webhook::notification::{Notification, NotificationFormat};
use crate::webhook::signature::SignatureVerifier;
use crate::webhook::token::{looks_like_token, TokenDecoder, TokenDecoderOptions};
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, instrument, warn};

/// Header carrying the legacy HMAC signature.
pub const SIGNATURE_HEADER: &str = "x-signature";

// ============================================================================
// Request/Response Types
// ============================================================================

/// Raw HTTP notification request.
///
/// # Examples
///
/// ```rust
/// use paygate_sdk::webhook::NotificationRequest;
/// use std::collections::HashMap;
///
/// let headers = HashMap::from([("X-Signature".to_string(), "ab12".to_string())]);
/// let request = NotificationRequest::new(headers, b"{}".to_vec().into());
///
/// assert_eq!(request.signature(), Some("ab12"));
/// ```
#[derive(Debug, Clone)]
pub struct NotificationRequest {
    headers: HashMap<String, String>,
    body: Bytes,
}

impl NotificationRequest {
    pub fn new(headers: HashMap<String, String>, body: Bytes) -> Self {
        Self { headers, body }
    }

    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// The legacy HMAC signature from `X-Signature`.
    pub fn signature(&self) -> Option<&str> {
        self.header(SIGNATURE_HEADER)
    }

    /// The body exactly as received.
    pub fn payload(&self) -> &[u8] {
        &self.body
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }
}

/// Immediate HTTP answer to the provider's dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationResponse {
    /// 200 OK - verified, parsed, and queued for handlers
    Ok { message: String },

    /// 400 Bad Request - malformed body or unsupported event
    BadRequest { message: String },

    /// 401 Unauthorized - signature or token verification failed
    Unauthorized { message: String },

    /// 502 Bad Gateway - signing keys could not be obtained; the provider should retry
    BadGateway { message: String },
}

impl NotificationResponse {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Ok { .. } => 200,
            Self::BadRequest { .. } => 400,
            Self::Unauthorized { .. } => 401,
            Self::BadGateway { .. } => 502,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Ok { message }
            | Self::BadRequest { message }
            | Self::Unauthorized { message }
            | Self::BadGateway { message } => message,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

impl From<&WebhookError> for NotificationResponse {
    fn from(error: &WebhookError) -> Self {
        let message = error.to_string();
        match error {
            WebhookError::Token(TokenError::Jwks(_)) => Self::BadGateway { message },
            e if e.is_authentication_failure() => Self::Unauthorized { message },
            _ => Self::BadRequest { message },
        }
    }
}

// ============================================================================
// Receiver
// ============================================================================

/// Verifies and parses inbound notifications and fans them out to handlers.
pub struct NotificationReceiver {
    resolver: Arc<dyn KeyResolver>,
    options: TokenDecoderOptions,
    legacy_secret: Option<String>,
    handlers: Arc<RwLock<Vec<Arc<dyn NotificationHandler>>>>,
}

impl NotificationReceiver {
    /// Create a receiver that only accepts token-delivered notifications.
    ///
    /// Tokens are always signature-verified here; `options.verify` is
    /// ignored. The unverified path is only reachable through
    /// [`TokenDecoder::unverified`].
    pub fn new(resolver: Arc<dyn KeyResolver>, options: TokenDecoderOptions) -> Self {
        if !options.verify {
            warn!("Ignoring request to skip token verification on the notification receiver");
        }

        Self {
            resolver,
            options: TokenDecoderOptions {
                verify: true,
                ..options
            },
            legacy_secret: None,
            handlers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Also accept legacy JSON notifications signed with `secret`.
    pub fn with_legacy_secret(mut self, secret: impl Into<String>) -> Self {
        self.legacy_secret = Some(secret.into());
        self
    }

    pub async fn add_handler(&self, handler: Arc<dyn NotificationHandler>) {
        self.handlers.write().await.push(handler);
    }

    /// Verify and parse a request without dispatching it.
    ///
    /// # Errors
    ///
    /// - [`WebhookError::Token`] when a token body fails decoding or verification
    /// - [`WebhookError::MissingSignature`] / [`WebhookError::SignatureMismatch`]
    ///   for a legacy body with a missing or wrong HMAC
    /// - [`WebhookError::LegacyDisabled`] for a legacy body when no secret is set
    /// - [`WebhookError::Notification`] when the verified body cannot be parsed
    #[instrument(skip(self, request), fields(body_len = request.payload().len()))]
    pub async fn parse(&self, request: &NotificationRequest) -> Result<Notification, WebhookError> {
        let token = std::str::from_utf8(request.payload())
            .ok()
            .filter(|body| looks_like_token(body));

        match token {
            Some(token) => self.parse_token(token.trim()).await,
            None => self.parse_legacy(request),
        }
    }

    async fn parse_token(&self, token: &str) -> Result<Notification, WebhookError> {
        let decoder = TokenDecoder::new(token, self.resolver.clone(), self.options);
        let payload = decoder.decode().await?;
        Ok(Notification::from_token_payload(token, payload)?)
    }

    fn parse_legacy(&self, request: &NotificationRequest) -> Result<Notification, WebhookError> {
        let secret = self
            .legacy_secret
            .as_deref()
            .ok_or(WebhookError::LegacyDisabled)?;
        let signature = request
            .signature()
            .filter(|s| !s.trim().is_empty())
            .ok_or(WebhookError::MissingSignature)?;

        if !SignatureVerifier::new(secret).verify(request.payload(), Some(signature)) {
            return Err(WebhookError::SignatureMismatch);
        }

        let notification = Notification::from_body(request.body.clone())?;
        if notification.format() != NotificationFormat::Legacy {
            return Err(NotificationError::InvalidPayload {
                message: "modern notifications must be delivered as signed tokens".to_string(),
            }
            .into());
        }

        Ok(notification)
    }

    /// Process a request and produce the HTTP answer.
    ///
    /// Registered handlers are spawned after a successful parse and are not
    /// awaited.
    pub async fn receive(&self, request: NotificationRequest) -> NotificationResponse {
        let notification = match self.parse(&request).await {
            Ok(notification) => notification,
            Err(e) => {
                warn!(error = %e, "Rejecting notification");
                return NotificationResponse::from(&e);
            }
        };

        info!(
            format = ?notification.format(),
            event = ?notification.event(),
            order_id = ?notification.order_id(),
            status = ?notification.status(),
            "Notification accepted"
        );

        let handlers = self.handlers.clone();
        let notification = Arc::new(notification);
        tokio::spawn(async move {
            let handlers_guard = handlers.read().await;
            for handler in handlers_guard.iter() {
                let handler = handler.clone();
                let notification = notification.clone();

                tokio::spawn(async move {
                    if let Err(e) = handler.handle_notification(&notification).await {
                        error!(
                            order_id = ?notification.order_id(),
                            error = %e,
                            "Handler execution failed"
                        );
                    }
                });
            }
        });

        NotificationResponse::Ok {
            message: "Notification received".to_string(),
        }
    }
}

impl std::fmt::Debug for NotificationReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationReceiver")
            .field("options", &self.options)
            .field(
                "legacy_secret",
                &self.legacy_secret.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

#[cfg(test)]
#[path = "receiver_tests.rs"]
mod tests;
