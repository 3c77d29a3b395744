//! # Paygate SDK
//!
//! Client library for a card payment gateway: merchant REST resources and
//! verification of the payment notifications the gateway sends back.
//!
//! This SDK provides:
//! - Verification of legacy HMAC-signed and modern ES256 token notifications
//! - JWKS signing key retrieval with a one hour cache
//! - A single notification type classifying both generations into
//!   success, failed or pending
//! - Thin REST wrappers for orders, refunds, operations and subscriptions
//! - File and environment configuration
//!
//! # Examples
//!
//! ## Classifying a notification
//!
//! ```rust
//! use paygate_sdk::webhook::Notification;
//!
//! let body = br#"{"status": "1", "operation": "declinedByTimeout", "mdOrder": "md-1"}"#;
//! let notification = Notification::from_body(&body[..]).unwrap();
//!
//! assert!(notification.is_failed());
//! assert_eq!(notification.md_order().as_deref(), Some("md-1"));
//! ```
//!
//! ## Receiving notifications
//!
//! ```rust,no_run
//! use paygate_sdk::settings::Settings;
//! use paygate_sdk::webhook::{NotificationReceiver, NotificationRequest};
//! use std::sync::Arc;
//!
//! # async fn example(request: NotificationRequest) -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::load(None)?;
//!
//! let mut receiver =
//!     NotificationReceiver::new(Arc::new(settings.key_store()?), settings.token_options());
//! if let Some(secret) = &settings.webhook.legacy_secret {
//!     receiver = receiver.with_legacy_secret(secret.clone());
//! }
//!
//! let response = receiver.receive(request).await;
//! println!("answer {}", response.status_code());
//! # Ok(())
//! # }
//! ```

// Public modules
pub mod client;
pub mod error;
pub mod settings;
pub mod webhook;

// Re-export commonly used types at crate root for convenience
pub use error::{ApiError, JwksError, NotificationError, SettingsError, TokenError, WebhookError};

pub use client::{ClientConfig, Environment, HttpClient, PaygateClient, ReqwestHttpClient};
pub use settings::Settings;
pub use webhook::{
    EventCategory, JwksKeyStore, Notification, NotificationFormat, NotificationHandler,
    NotificationReceiver, SignatureVerifier, TokenDecoder, TokenDecoderOptions,
};
