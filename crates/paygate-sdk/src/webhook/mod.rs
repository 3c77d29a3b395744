//! Payment notification intake and verification.
//!
//! The gateway delivers notifications in two generations:
//!
//! - **Legacy**: flat JSON signed with HMAC-SHA256 over the raw body.
//! - **Modern**: an ES256-signed compact token whose signing keys are
//!   published as a JWKS document.
//!
//! # Core Components
//!
//! - [`Notification`] - parsed notification with typed, null-safe accessors
//!   and success/failed/pending classification
//! - [`SignatureVerifier`] - legacy HMAC signing and constant-time checks
//! - [`JwksKeyStore`] - cached signing keys (one hour TTL, refreshed inline)
//! - [`TokenDecoder`] - ES256-pinned token verification
//! - [`NotificationReceiver`] - request intake that answers the provider and
//!   dispatches to [`NotificationHandler`]s
//!
//! # Security
//!
//! Legacy signatures are checked over the bytes as received, before any
//! parsing or key normalization. Token verification refuses every algorithm
//! except ES256 before a key is even looked up.
//!
//! # HTTP Server Integration (Axum Example)
//!
//! ```rust,ignore
//! use paygate_sdk::webhook::{NotificationReceiver, NotificationRequest};
//! use axum::{
//!     extract::State,
//!     http::{HeaderMap, StatusCode},
//!     response::{IntoResponse, Response},
//!     routing::post,
//!     Router,
//! };
//! use bytes::Bytes;
//! use std::sync::Arc;
//!
//! async fn handle_notification(
//!     State(receiver): State<Arc<NotificationReceiver>>,
//!     headers: HeaderMap,
//!     body: Bytes,
//! ) -> Response {
//!     let headers = headers
//!         .iter()
//!         .map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap_or("").to_string()))
//!         .collect();
//!
//!     let response = receiver.receive(NotificationRequest::new(headers, body)).await;
//!
//!     let status = StatusCode::from_u16(response.status_code()).unwrap();
//!     (status, response.message().to_string()).into_response()
//! }
//!
//! # fn router(receiver: Arc<NotificationReceiver>) -> Router {
//! Router::new()
//!     .route("/notifications", post(handle_notification))
//!     .with_state(receiver)
//! # }
//! ```

pub mod handler;
pub mod jwks;
pub mod keys;
pub mod notification;
pub mod receiver;
pub mod signature;
pub mod token;

#[cfg(test)]
mod test_support;

// Re-export main types
pub use handler::NotificationHandler;
pub use jwks::{Clock, JwksKeyStore, KeyResolver, SigningKeySet, SystemClock};
pub use keys::{normalize_keys, to_snake_case};
pub use notification::{
    EventCategory, LegacyNotification, ModernNotification, NormalizedNotification, Notification,
    NotificationFormat, RawNotification, StatusClassification, SubView,
};
pub use receiver::{NotificationReceiver, NotificationRequest, NotificationResponse};
pub use signature::SignatureVerifier;
pub use token::{TokenDecoder, TokenDecoderOptions};
