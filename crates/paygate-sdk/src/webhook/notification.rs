//! Notification parsing and status classification.
//!
//! Two webhook generations coexist:
//!
//! - **Legacy**: a flat, HMAC-signed JSON object (`status`, `operation`,
//!   `md_order`, `authorize_id`, ...).
//! - **Modern**: the payload of an ES256 token, with an `event` category and
//!   nested `operation`, `order` or `subscription` objects.
//!
//! [`Notification`] decides the format once, at construction, and then
//! exposes both through one read-only accessor surface. All keys are
//! normalized to snake_case before any lookup.
//!
//! # Examples
//!
//! ```
//! use paygate_sdk::webhook::{EventCategory, Notification};
//!
//! let body = br#"{"event": "ORDER_STATUS_UPDATED",
//!                 "order": {"orderId": "order-123", "paymentStatus": "CAPTURED"}}"#;
//! let notification = Notification::from_body(&body[..]).unwrap();
//!
//! assert_eq!(notification.event(), Some(EventCategory::OrderStatusUpdated));
//! assert_eq!(notification.order_id().as_deref(), Some("order-123"));
//! assert!(notification.is_success());
//! ```

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::keys::normalize_keys;
use super::signature::SignatureVerifier;
use crate::error::NotificationError;

/// Keys that only legacy notifications carry (after normalization).
pub const LEGACY_MARKER_KEYS: [&str; 3] = ["checksum", "md_order", "authorize_id"];

/// Legacy `operation` value that marks an authorization timeout.
pub const DECLINED_BY_TIMEOUT: &str = "declinedByTimeout";

/// Order payment statuses that count as a successful payment.
pub const ORDER_SUCCESS_STATUSES: [&str; 6] = [
    "AUTHORIZED",
    "CAPTURED",
    "CONFIRMED",
    "PARTIALLY_REFUNDED",
    "REFUNDED",
    "VOIDED",
];

/// Subscription statuses that count as failed.
pub const SUBSCRIPTION_FAILED_STATUSES: [&str; 2] = ["CANCELLED", "EXPIRED"];

/// Which webhook generation a notification belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationFormat {
    Legacy,
    Modern,
}

/// Event categories of modern notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCategory {
    OrderStatusUpdated,
    OperationStatusUpdated,
    SubscriptionStatusUpdated,
    RefundStatusUpdated,
}

impl EventCategory {
    /// Wire name of the category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrderStatusUpdated => "ORDER_STATUS_UPDATED",
            Self::OperationStatusUpdated => "OPERATION_STATUS_UPDATED",
            Self::SubscriptionStatusUpdated => "SUBSCRIPTION_STATUS_UPDATED",
            Self::RefundStatusUpdated => "REFUND_STATUS_UPDATED",
        }
    }
}

impl FromStr for EventCategory {
    type Err = NotificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ORDER_STATUS_UPDATED" => Ok(Self::OrderStatusUpdated),
            "OPERATION_STATUS_UPDATED" => Ok(Self::OperationStatusUpdated),
            "SUBSCRIPTION_STATUS_UPDATED" => Ok(Self::SubscriptionStatusUpdated),
            "REFUND_STATUS_UPDATED" => Ok(Self::RefundStatusUpdated),
            other => Err(NotificationError::UnsupportedType {
                event: Some(other.to_string()),
            }),
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Raw and normalized data
// ============================================================================

/// The notification exactly as received.
///
/// Signatures are computed over these bytes, so they are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawNotification {
    bytes: Bytes,
}

impl RawNotification {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// The notification after recursive snake_case key normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedNotification {
    data: Map<String, Value>,
}

impl NormalizedNotification {
    fn from_value(value: &Value) -> Result<Self, NotificationError> {
        match normalize_keys(value) {
            Value::Object(data) => Ok(Self { data }),
            other => Err(NotificationError::InvalidPayload {
                message: format!("expected a JSON object, got {}", json_type(&other)),
            }),
        }
    }

    /// Top-level value for `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Top-level scalar for `key`, rendered as text.
    pub fn text(&self, key: &str) -> Option<Cow<'_, str>> {
        self.get(key).and_then(scalar_text)
    }

    /// A nested object (`operation`, `order`, `subscription`), if present.
    pub fn view(&self, name: &str) -> Option<SubView<'_>> {
        self.get(name).and_then(Value::as_object).map(SubView)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.data
    }

    fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }
}

/// Read-only projection of a nested notification object.
#[derive(Debug, Clone, Copy)]
pub struct SubView<'a>(&'a Map<String, Value>);

impl<'a> SubView<'a> {
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.0.get(key)
    }

    pub fn text(&self, key: &str) -> Option<Cow<'a, str>> {
        self.get(key).and_then(scalar_text)
    }
}

fn scalar_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Bool(b) => Some(Cow::Owned(b.to_string())),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ============================================================================
// Format-specific classification
// ============================================================================

/// Status classification shared by both notification generations.
pub trait StatusClassification {
    /// The status value the classification is based on.
    fn status(&self) -> Option<Cow<'_, str>>;
    fn is_success(&self) -> bool;
    fn is_failed(&self) -> bool;
    fn is_pending(&self) -> bool;
}

/// A flat, HMAC-signed notification.
#[derive(Debug, Clone)]
pub struct LegacyNotification {
    raw: RawNotification,
    data: NormalizedNotification,
}

impl LegacyNotification {
    /// The `operation` field (for example `approved` or `declinedByTimeout`).
    pub fn operation(&self) -> Option<Cow<'_, str>> {
        self.data.text("operation")
    }

    fn timed_out(&self) -> bool {
        self.operation().as_deref() == Some(DECLINED_BY_TIMEOUT)
    }
}

impl StatusClassification for LegacyNotification {
    fn status(&self) -> Option<Cow<'_, str>> {
        self.data.text("status")
    }

    fn is_success(&self) -> bool {
        self.status().as_deref() == Some("1") && !self.timed_out()
    }

    fn is_failed(&self) -> bool {
        self.status().as_deref() == Some("0") || self.timed_out()
    }

    fn is_pending(&self) -> bool {
        !self.is_success() && !self.is_failed()
    }
}

/// A token-delivered notification with a validated event category.
#[derive(Debug, Clone)]
pub struct ModernNotification {
    raw: RawNotification,
    data: NormalizedNotification,
    event: EventCategory,
}

impl ModernNotification {
    pub fn event(&self) -> EventCategory {
        self.event
    }

    pub fn operation_status(&self) -> Option<Cow<'_, str>> {
        self.data.view("operation").and_then(|v| v.text("status"))
    }

    pub fn payment_status(&self) -> Option<Cow<'_, str>> {
        self.data.view("order").and_then(|v| v.text("payment_status"))
    }

    pub fn subscription_status(&self) -> Option<Cow<'_, str>> {
        self.data.view("subscription").and_then(|v| v.text("status"))
    }

    fn classify(&self) -> Outcome {
        match self.event {
            EventCategory::OperationStatusUpdated => {
                classify_operation(self.operation_status().as_deref())
            }
            EventCategory::OrderStatusUpdated => classify_order(self.payment_status().as_deref()),
            EventCategory::SubscriptionStatusUpdated => {
                classify_subscription(self.subscription_status().as_deref())
            }
            // Refunds are operations on an order: prefer the operation status,
            // fall back to the order's payment status.
            EventCategory::RefundStatusUpdated => match self.operation_status() {
                Some(status) => classify_operation(Some(status.as_ref())),
                None => classify_order(self.payment_status().as_deref()),
            },
        }
    }
}

impl StatusClassification for ModernNotification {
    fn status(&self) -> Option<Cow<'_, str>> {
        self.operation_status()
            .or_else(|| self.payment_status())
            .or_else(|| self.subscription_status())
    }

    fn is_success(&self) -> bool {
        self.classify() == Outcome::Success
    }

    fn is_failed(&self) -> bool {
        self.classify() == Outcome::Failed
    }

    fn is_pending(&self) -> bool {
        self.classify() == Outcome::Pending
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    Failed,
    Pending,
    Unknown,
}

fn classify_operation(status: Option<&str>) -> Outcome {
    match status {
        Some("SUCCESS") => Outcome::Success,
        Some("FAIL") => Outcome::Failed,
        Some("PENDING") => Outcome::Pending,
        _ => Outcome::Unknown,
    }
}

fn classify_order(status: Option<&str>) -> Outcome {
    match status {
        Some(s) if ORDER_SUCCESS_STATUSES.contains(&s) => Outcome::Success,
        Some("FAILED") => Outcome::Failed,
        Some("PENDING") => Outcome::Pending,
        _ => Outcome::Unknown,
    }
}

fn classify_subscription(status: Option<&str>) -> Outcome {
    match status {
        Some("ACTIVE") => Outcome::Success,
        Some(s) if SUBSCRIPTION_FAILED_STATUSES.contains(&s) => Outcome::Failed,
        Some("NEW") => Outcome::Pending,
        _ => Outcome::Unknown,
    }
}

// ============================================================================
// Notification
// ============================================================================

/// A parsed, classified webhook notification of either generation.
///
/// Construction fails outright for a modern notification with an unknown
/// event; there is no partially valid instance. Every accessor is null-safe
/// and returns `None` when the field or its parent object is absent.
#[derive(Debug, Clone)]
pub enum Notification {
    Legacy(LegacyNotification),
    Modern(ModernNotification),
}

impl Notification {
    /// Parse a JSON body, keeping the exact bytes for signature checks.
    ///
    /// # Errors
    ///
    /// - [`NotificationError::InvalidPayload`] when the body is not a JSON object
    /// - [`NotificationError::UnsupportedType`] for a modern body with an unknown event
    pub fn from_body(body: impl Into<Bytes>) -> Result<Self, NotificationError> {
        let raw = RawNotification::new(body);
        let value: Value =
            serde_json::from_slice(raw.as_bytes()).map_err(|e| NotificationError::InvalidPayload {
                message: format!("body is not valid JSON: {}", e),
            })?;
        Self::build(raw, &value, None)
    }

    /// Build from already-parsed data.
    ///
    /// The raw form is re-serialized JSON, which may differ from the bytes the
    /// sender signed. Prefer [`Notification::from_body`] whenever the original
    /// body is available.
    pub fn from_value(value: Value) -> Result<Self, NotificationError> {
        let bytes = serde_json::to_vec(&value).map_err(|e| NotificationError::InvalidPayload {
            message: e.to_string(),
        })?;
        Self::build(RawNotification::new(bytes), &value, None)
    }

    /// Build from the decoded payload of a signed token. Always modern.
    pub fn from_token_payload(token: &str, payload: Value) -> Result<Self, NotificationError> {
        let raw = RawNotification::new(Bytes::copy_from_slice(token.as_bytes()));
        Self::build(raw, &payload, Some(NotificationFormat::Modern))
    }

    fn build(
        raw: RawNotification,
        value: &Value,
        forced: Option<NotificationFormat>,
    ) -> Result<Self, NotificationError> {
        let data = NormalizedNotification::from_value(value)?;
        let format = forced.unwrap_or_else(|| detect_format(&data));

        match format {
            NotificationFormat::Legacy => Ok(Self::Legacy(LegacyNotification { raw, data })),
            NotificationFormat::Modern => {
                let event = match data.get("event") {
                    Some(Value::String(name)) => name.parse::<EventCategory>()?,
                    Some(Value::Null) | None => {
                        return Err(NotificationError::UnsupportedType { event: None })
                    }
                    Some(other) => {
                        return Err(NotificationError::UnsupportedType {
                            event: Some(other.to_string()),
                        })
                    }
                };
                Ok(Self::Modern(ModernNotification { raw, data, event }))
            }
        }
    }

    fn classifier(&self) -> &dyn StatusClassification {
        match self {
            Self::Legacy(n) => n,
            Self::Modern(n) => n,
        }
    }

    /// Normalized data.
    pub fn data(&self) -> &NormalizedNotification {
        match self {
            Self::Legacy(n) => &n.data,
            Self::Modern(n) => &n.data,
        }
    }

    /// The bytes as received (or re-serialized, see [`Notification::from_value`]).
    pub fn raw(&self) -> &RawNotification {
        match self {
            Self::Legacy(n) => &n.raw,
            Self::Modern(n) => &n.raw,
        }
    }

    pub fn format(&self) -> NotificationFormat {
        match self {
            Self::Legacy(_) => NotificationFormat::Legacy,
            Self::Modern(_) => NotificationFormat::Modern,
        }
    }

    /// Event category; always `None` for legacy notifications.
    pub fn event(&self) -> Option<EventCategory> {
        match self {
            Self::Legacy(_) => None,
            Self::Modern(n) => Some(n.event),
        }
    }

    // ------------------------------------------------------------------------
    // Identifiers
    // ------------------------------------------------------------------------

    /// Order id from the operation, then the order, then the top level.
    pub fn order_id(&self) -> Option<Cow<'_, str>> {
        let data = self.data();
        data.view("operation")
            .and_then(|v| v.text("order_id"))
            .or_else(|| data.view("order").and_then(|v| v.text("order_id")))
            .or_else(|| data.text("order_id"))
    }

    pub fn operation_id(&self) -> Option<Cow<'_, str>> {
        self.operation_field("operation_id")
    }

    pub fn external_operation_id(&self) -> Option<Cow<'_, str>> {
        self.operation_field("external_operation_id")
    }

    pub fn operation_type(&self) -> Option<Cow<'_, str>> {
        self.operation_field("operation_type")
    }

    pub fn operation_status(&self) -> Option<Cow<'_, str>> {
        self.operation_field("status")
    }

    pub fn payment_status(&self) -> Option<Cow<'_, str>> {
        self.data().view("order").and_then(|v| v.text("payment_status"))
    }

    /// The subscription id (`customer_subscription_id` on the wire).
    pub fn subscription_id(&self) -> Option<Cow<'_, str>> {
        self.data()
            .view("subscription")
            .and_then(|v| v.text("customer_subscription_id"))
    }

    pub fn subscription_status(&self) -> Option<Cow<'_, str>> {
        self.data().view("subscription").and_then(|v| v.text("status"))
    }

    /// Whether the order cart changed since creation.
    pub fn cart_updated(&self) -> Option<bool> {
        self.data()
            .view("order")
            .and_then(|v| v.get("cart_updated"))
            .and_then(Value::as_bool)
    }

    /// Failure or decline reason: `reason`, else `reason_code`, at the top
    /// level first and then inside the operation.
    pub fn reason(&self) -> Option<Cow<'_, str>> {
        let data = self.data();
        data.text("reason")
            .or_else(|| data.text("reason_code"))
            .or_else(|| self.operation_field("reason"))
            .or_else(|| self.operation_field("reason_code"))
    }

    fn operation_field(&self, key: &str) -> Option<Cow<'_, str>> {
        self.data().view("operation").and_then(|v| v.text(key))
    }

    // ------------------------------------------------------------------------
    // Modern envelope fields
    // ------------------------------------------------------------------------

    /// `event_time`, if present and valid RFC 3339.
    pub fn event_time(&self) -> Option<DateTime<Utc>> {
        self.data()
            .text("event_time")
            .and_then(|t| DateTime::parse_from_rfc3339(&t).ok())
            .map(|t| t.with_timezone(&Utc))
    }

    /// `merchant_id`, if present and a valid UUID.
    pub fn merchant_id(&self) -> Option<Uuid> {
        self.data()
            .text("merchant_id")
            .and_then(|id| Uuid::parse_str(&id).ok())
    }

    // ------------------------------------------------------------------------
    // Legacy fields
    // ------------------------------------------------------------------------

    /// Legacy `operation` (for example `approved`, `declinedByTimeout`).
    pub fn operation(&self) -> Option<Cow<'_, str>> {
        self.data().text("operation")
    }

    pub fn amount(&self) -> Option<Cow<'_, str>> {
        self.data().text("amount")
    }

    pub fn md_order(&self) -> Option<Cow<'_, str>> {
        self.data().text("md_order")
    }

    pub fn payment_id(&self) -> Option<Cow<'_, str>> {
        self.data().text("payment_id")
    }

    pub fn authorize_id(&self) -> Option<Cow<'_, str>> {
        self.data().text("authorize_id")
    }

    pub fn capture_id(&self) -> Option<Cow<'_, str>> {
        self.data().text("capture_id")
    }

    pub fn refund_id(&self) -> Option<Cow<'_, str>> {
        self.data().text("refund_id")
    }

    pub fn cancel_id(&self) -> Option<Cow<'_, str>> {
        self.data().text("cancel_id")
    }

    pub fn checksum(&self) -> Option<Cow<'_, str>> {
        self.data().text("checksum")
    }

    // ------------------------------------------------------------------------
    // Classification
    // ------------------------------------------------------------------------

    /// Legacy: the raw `status`. Modern: the first of operation, payment and
    /// subscription status.
    pub fn status(&self) -> Option<Cow<'_, str>> {
        self.classifier().status()
    }

    pub fn is_success(&self) -> bool {
        self.classifier().is_success()
    }

    pub fn is_failed(&self) -> bool {
        self.classifier().is_failed()
    }

    pub fn is_pending(&self) -> bool {
        self.classifier().is_pending()
    }

    /// Check an HMAC signature over the raw, pre-normalization bytes.
    ///
    /// Returns `false` for a missing or empty signature.
    pub fn has_valid_signature(&self, secret: &str, signature: Option<&str>) -> bool {
        SignatureVerifier::new(secret).verify(self.raw().as_bytes(), signature)
    }
}

/// Legacy when any legacy-only key is present, or when there is no `event` at all.
fn detect_format(data: &NormalizedNotification) -> NotificationFormat {
    let has_marker = LEGACY_MARKER_KEYS.iter().any(|k| data.contains_key(k));
    if has_marker || !data.contains_key("event") {
        NotificationFormat::Legacy
    } else {
        NotificationFormat::Modern
    }
}

#[cfg(test)]
#[path = "notification_tests.rs"]
mod tests;
