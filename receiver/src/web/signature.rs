//! Telnyx webhook signature verification.
//!
//! Telnyx signs webhook requests with Ed25519. The portal publishes a raw
//! 32-byte public key (base64); each request carries the signature and the
//! timestamp it covers in headers. Reference:
//! https://developers.telnyx.com/docs/development/webhooks
//!
//! Verification is byte-exact: the signed message is reconstructed by the
//! canonicalization policy and checked with `ed25519-dalek`, whose verify
//! is constant-time. No comparison is implemented by hand here.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::warn;

use crate::canonical::{signed_message, CanonicalizationPolicy};
use crate::config::Config;

/// Header carrying the base64 Ed25519 signature.
pub const SIGNATURE_HEADER: &str = "telnyx-signature-ed25519";

/// Header carrying the timestamp the signature covers.
pub const TIMESTAMP_HEADER: &str = "telnyx-timestamp";

/// Outcome of verifying one request.
///
/// Downstream event logic is reachable only from `Valid`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// Signature verifies over the reconstructed message.
    Valid,
    /// Well-formed signature that does not verify (or a stale timestamp
    /// when a replay window is configured).
    Invalid,
    /// Inputs could not be decoded into a verifiable form.
    Malformed(String),
}

/// Failure importing the configured public key. Fatal at startup.
#[derive(Debug, Error)]
pub enum PublicKeyError {
    #[error("public key is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("public key must decode to 32 bytes, got {0}")]
    Length(usize),
    #[error("public key bytes are not a valid Ed25519 key: {0}")]
    Import(#[from] ed25519_dalek::SignatureError),
}

/// Verifies webhook signatures against the process-wide public key.
///
/// Constructed once at startup from configuration and shared immutably
/// across requests; verification is a pure function of its inputs.
pub struct WebhookVerifier {
    verifying_key: VerifyingKey,
    policy: CanonicalizationPolicy,
    max_age: Option<u64>,
}

impl WebhookVerifier {
    /// Build a verifier from a base64-encoded raw 32-byte public key.
    ///
    /// The key string is trimmed before decoding; keys pasted from the
    /// portal routinely carry a trailing newline.
    pub fn new(
        public_key_base64: &str,
        policy: CanonicalizationPolicy,
        max_age: Option<u64>,
    ) -> Result<Self, PublicKeyError> {
        let bytes = BASE64.decode(public_key_base64.trim())?;
        let bytes: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| PublicKeyError::Length(bytes.len()))?;
        let verifying_key = VerifyingKey::from_bytes(&bytes)?;
        Ok(Self {
            verifying_key,
            policy,
            max_age,
        })
    }

    /// Build a verifier from loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, PublicKeyError> {
        let key = config.telnyx_public_key.as_deref().unwrap_or("");
        Self::new(key, config.signature_policy, config.signature_max_age)
    }

    /// The canonicalization policy this verifier reconstructs messages with.
    pub fn policy(&self) -> CanonicalizationPolicy {
        self.policy
    }

    /// Verify a request's signature over its reconstructed signed message.
    pub fn verify(
        &self,
        timestamp: &str,
        signature_base64: &str,
        raw_body: &[u8],
    ) -> VerificationOutcome {
        let signature_bytes = match BASE64.decode(signature_base64) {
            Ok(bytes) => bytes,
            Err(_) => {
                warn!(
                    signature_length = signature_base64.len(),
                    "signature_base64_invalid"
                );
                return VerificationOutcome::Malformed(
                    "invalid signature encoding".to_string(),
                );
            }
        };

        let signature_bytes: [u8; 64] = match signature_bytes.as_slice().try_into() {
            Ok(bytes) => bytes,
            Err(_) => {
                warn!(
                    decoded_length = signature_bytes.len(),
                    "signature_length_invalid"
                );
                return VerificationOutcome::Malformed("invalid signature length".to_string());
            }
        };

        if let Some(max_age) = self.max_age {
            if !timestamp_within_window(timestamp, max_age) {
                return VerificationOutcome::Invalid;
            }
        }

        let message = signed_message(self.policy, timestamp, raw_body);
        let signature = Signature::from_bytes(&signature_bytes);

        match self.verifying_key.verify(&message, &signature) {
            Ok(()) => VerificationOutcome::Valid,
            Err(_) => VerificationOutcome::Invalid,
        }
    }
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key bytes stay out of logs.
        f.debug_struct("WebhookVerifier")
            .field("policy", &self.policy)
            .field("max_age", &self.max_age)
            .finish_non_exhaustive()
    }
}

/// Check that a webhook timestamp is within the replay window.
fn timestamp_within_window(timestamp: &str, max_age: u64) -> bool {
    let webhook_time: u64 = match timestamp.parse() {
        Ok(t) => t,
        Err(_) => {
            warn!("signature_timestamp_not_numeric");
            return false;
        }
    };

    let current_time = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    let age = current_time.abs_diff(webhook_time);

    if age > max_age {
        warn!(
            webhook_time = webhook_time,
            age_seconds = age,
            max_age_seconds = max_age,
            "signature_timestamp_stale"
        );
        return false;
    }

    true
}
