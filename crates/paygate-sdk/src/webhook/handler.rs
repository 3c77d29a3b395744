//! Application-provided notification processing.
//!
//! Handlers run after the receiver has already answered the provider, so a
//! slow or failing handler never delays the acknowledgment.
//!
//! # Examples
//!
//! ```rust,no_run
//! use paygate_sdk::webhook::{Notification, NotificationHandler};
//! use async_trait::async_trait;
//!
//! struct FulfilmentHandler;
//!
//! #[async_trait]
//! impl NotificationHandler for FulfilmentHandler {
//!     async fn handle_notification(
//!         &self,
//!         notification: &Notification,
//!     ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!         if notification.is_success() {
//!             println!("ship order {:?}", notification.order_id());
//!         }
//!         Ok(())
//!     }
//! }
//! ```

use crate::webhook::notification::Notification;
use async_trait::async_trait;
use std::error::Error;

/// Processes accepted notifications.
///
/// Errors are logged by the receiver and otherwise ignored; the provider has
/// already been acknowledged. Handlers needing retries must provide their own.
/// Every registered handler is spawned concurrently for each notification.
#[async_trait]
pub trait NotificationHandler: Send + Sync {
    /// Handle one verified, classified notification.
    async fn handle_notification(
        &self,
        notification: &Notification,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
