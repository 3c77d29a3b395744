//! HMAC-SHA256 signatures for legacy notifications.
//!
//! Legacy callbacks are signed with a shared secret over the exact body bytes
//! the gateway sent. Verification must therefore run on the raw body, before
//! any parsing or key normalization.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Signs and verifies legacy notification bodies with a shared secret.
///
/// # Security
///
/// - Comparison time does not depend on the position of the first mismatch
/// - Never logs the secret or signature values
/// - Fails closed: a missing or malformed signature is simply `false`
///
/// # Examples
///
/// ```
/// use paygate_sdk::webhook::SignatureVerifier;
///
/// let verifier = SignatureVerifier::new("merchant-secret");
/// let body = br#"{"status":"1","operation":"approved","md_order":"42"}"#;
///
/// let signature = verifier.sign(body).unwrap();
/// assert!(verifier.verify(body, Some(&signature)));
/// assert!(!verifier.verify(body, None));
/// ```
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: String,
}

impl SignatureVerifier {
    /// Create a verifier for the given shared secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Compute the lowercase hex HMAC-SHA256 of `body`.
    ///
    /// Returns `None` when the MAC cannot be keyed with the secret.
    pub fn sign(&self, body: &[u8]) -> Option<String> {
        self.compute_hmac(body).map(hex::encode)
    }

    /// Check `signature` against the HMAC of `body`.
    ///
    /// Returns `false` (never an error) when the signature is absent, empty or
    /// of a different length than the expected digest. Hex case is ignored.
    pub fn verify(&self, body: &[u8], signature: Option<&str>) -> bool {
        let provided = match signature.map(str::trim) {
            Some(sig) if !sig.is_empty() => sig.to_ascii_lowercase(),
            _ => return false,
        };

        let Some(expected) = self.sign(body) else {
            return false;
        };
        constant_time_eq(expected.as_bytes(), provided.as_bytes())
    }

    fn compute_hmac(&self, body: &[u8]) -> Option<Vec<u8>> {
        let mut mac = match HmacSha256::new_from_slice(self.secret.as_bytes()) {
            Ok(mac) => mac,
            Err(e) => {
                warn!(error = %e, "Unable to key HMAC with the configured secret");
                return None;
            }
        };
        mac.update(body);
        Some(mac.finalize().into_bytes().to_vec())
    }
}

/// Compare two byte strings without an early exit on the first difference.
///
/// A length mismatch returns immediately since the digest length is public.
/// Equal-length inputs are XOR-accumulated over every byte and the single
/// accumulator is tested once.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let diff = a
        .iter()
        .zip(b.iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y));

    diff.ct_eq(&0u8).into()
}

// Security: Don't expose secrets in debug output
impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &"<REDACTED>")
            .finish()
    }
}

#[cfg(test)]
#[path = "signature_tests.rs"]
mod tests;
