//! Web server module for handling inbound Telnyx webhooks.
//!
//! This module provides a small web server that:
//! - Receives call-event webhooks from Telnyx
//! - Verifies the Ed25519 signature over the exact raw body bytes
//! - Replies synchronously with a call-control command sequence
//!
//! Verification gates everything: no payload is parsed for business logic
//! until its signature has been checked.

pub mod handlers;
pub mod signature;

pub use handlers::{health, telnyx_webhook, AppState, CommandResponse, ErrorResponse, HealthResponse};
pub use signature::{
    VerificationOutcome, WebhookVerifier, SIGNATURE_HEADER, TIMESTAMP_HEADER,
};
