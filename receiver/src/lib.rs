//! CallBridge - Telnyx call-control webhook receiver.
//!
//! Authenticates inbound call-event notifications from Telnyx by verifying
//! an Ed25519 signature over the exact bytes the provider signed, then
//! replies with a short command sequence (answer the call, connect it to a
//! configured SIP destination).
//!
//! ## Pipeline
//!
//! ```text
//! raw body capture → canonicalize signed message → verify signature → dispatch event → respond
//! ```
//!
//! Each stage's failure is a typed `WebhookError`; later stages never run
//! on failure.

pub mod canonical;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod web;

// Re-export commonly used types
pub use canonical::CanonicalizationPolicy;
pub use config::Config;
pub use dispatch::{dispatch, CallEvent, Command};
pub use error::WebhookError;
pub use web::{AppState, VerificationOutcome, WebhookVerifier};
