//! Error types for Paygate SDK operations.
//!
//! Each concern gets its own error enum so callers can react precisely:
//! a JWKS outage is worth retrying, a forged token never is.

use thiserror::Error;

/// Errors raised while fetching or resolving the provider's public signing keys.
#[derive(Debug, Error)]
pub enum JwksError {
    /// Network or transport failure while fetching the key set.
    #[error("JWKS fetch failed: {message}")]
    Fetch { message: String },

    /// The JWKS endpoint answered with a non-success status.
    #[error("JWKS fetch failed with HTTP status {status}")]
    HttpStatus { status: u16 },

    /// The JWKS body is not valid JSON or carries no usable keys.
    #[error("JWKS parse failed: {message}")]
    Parse { message: String },

    /// No key in the current key set matches the requested key id.
    #[error("No signing key found for kid '{kid}'")]
    KeyNotFound { kid: String },
}

impl JwksError {
    /// Check if this error represents a condition that a later fetch may clear.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Fetch { .. } => true,
            Self::HttpStatus { status } => *status >= 500 || *status == 429,
            Self::Parse { .. } => false,
            Self::KeyNotFound { .. } => false,
        }
    }
}

/// Errors raised while decoding or verifying a signed notification token.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Malformed structure, undecodable segments or a disallowed algorithm.
    #[error("Invalid token: {message}")]
    InvalidToken { message: String },

    /// The header names a key id absent from the current key set.
    ///
    /// Rejected like [`TokenError::InvalidToken`], but the provider may have
    /// rotated its keys since the set was cached.
    #[error("Invalid token: no signing key found for kid '{kid}'")]
    UnknownKey { kid: String },

    /// The signature does not verify against the resolved key.
    #[error("Token signature verification failed")]
    InvalidSignature,

    /// The `exp` claim lies in the past.
    #[error("Token has expired")]
    TokenExpired,

    /// The signing keys could not be fetched or parsed.
    #[error("Signing key lookup failed: {0}")]
    Jwks(JwksError),
}

impl TokenError {
    /// True when refreshing the key set and retrying could change the outcome.
    ///
    /// Signature, expiry and structural failures are final. Key-set fetch
    /// problems and unknown key ids are worth another attempt after
    /// invalidating the cached set.
    pub fn is_key_refresh_candidate(&self) -> bool {
        matches!(self, Self::Jwks(_) | Self::UnknownKey { .. })
    }
}

impl From<JwksError> for TokenError {
    fn from(e: JwksError) -> Self {
        match e {
            JwksError::KeyNotFound { kid } => Self::UnknownKey { kid },
            other => Self::Jwks(other),
        }
    }
}

/// Errors raised while building a notification from decoded data.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// A modern notification carries an event type this SDK does not know.
    #[error("Unsupported notification event type: {}", event.as_deref().unwrap_or("<missing>"))]
    UnsupportedType { event: Option<String> },

    /// The body is not a JSON object.
    #[error("Invalid notification payload: {message}")]
    InvalidPayload { message: String },
}

/// Top-level webhook intake errors.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Notification(#[from] NotificationError),

    /// A legacy notification arrived without a signature while a secret is configured.
    #[error("Missing notification signature")]
    MissingSignature,

    /// A legacy notification signature does not match the computed HMAC.
    #[error("Notification signature mismatch")]
    SignatureMismatch,

    /// A legacy notification arrived but no legacy signing secret is configured.
    #[error("Legacy notifications are not accepted: no signing secret configured")]
    LegacyDisabled,
}

impl WebhookError {
    /// True when the notification must be treated as untrusted rather than malformed.
    pub fn is_authentication_failure(&self) -> bool {
        match self {
            Self::MissingSignature | Self::SignatureMismatch | Self::LegacyDisabled => true,
            Self::Token(TokenError::InvalidSignature) => true,
            Self::Token(TokenError::TokenExpired) => true,
            Self::Token(TokenError::InvalidToken { .. }) => true,
            Self::Token(TokenError::UnknownKey { .. }) => true,
            Self::Token(TokenError::Jwks(_)) => false,
            Self::Notification(_) => false,
        }
    }
}

/// Errors during REST API operations.
///
/// These errors represent failures when communicating with the payment
/// gateway API, including HTTP errors, timeouts and parsing failures.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP error response from the API.
    #[error("HTTP error: {status} - {message}")]
    HttpError { status: u16, message: String },

    /// Request to the API timed out.
    #[error("Request timeout")]
    Timeout,

    /// The request could not be built (bad path, unserializable body).
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Failed to parse the JSON response body.
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// HTTP client error (network, TLS, etc.).
    #[error("HTTP client error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ApiError {
    /// Check if this error represents a transient condition that may succeed if retried.
    ///
    /// Transient conditions include:
    /// - Server errors (5xx)
    /// - Rate limiting (429)
    /// - Request timeouts
    /// - Network/transport errors
    pub fn is_transient(&self) -> bool {
        match self {
            Self::HttpError { status, .. } => *status >= 500 || *status == 429,
            Self::Timeout => true,
            Self::InvalidRequest { .. } => false,
            Self::JsonError(_) => false,
            Self::Transport(e) => !e.is_decode() && !e.is_builder(),
        }
    }
}

/// Errors while loading SDK settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The configuration sources could not be read or deserialized.
    #[error("Failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    /// A required field is missing or empty.
    #[error("Required setting missing: {field}")]
    Required { field: String },

    /// A field has an invalid value.
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
