//! Webhook endpoint handlers.
//!
//! The Telnyx handler is a fixed pipeline:
//! 1. Require the signature and timestamp headers
//! 2. Capture the raw body bytes, bounded, before any parsing
//! 3. Verify the Ed25519 signature over the reconstructed signed message
//! 4. Dispatch the verified event to a command sequence
//!
//! Any stage failure short-circuits as a `WebhookError`; later stages never
//! run on failure, and every outcome maps to exactly one response.

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::dispatch::{dispatch, CallEvent, Command};
use crate::error::WebhookError;
use crate::web::signature::{
    VerificationOutcome, WebhookVerifier, SIGNATURE_HEADER, TIMESTAMP_HEADER,
};
use crate::Config;

/// Shared application state.
///
/// The verifier and destination are fixed at startup; requests share them
/// immutably, so the handler is safe under arbitrary concurrency.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub verifier: Arc<WebhookVerifier>,
    pub destination: Arc<str>,
}

impl AppState {
    pub fn new(config: Config, verifier: WebhookVerifier, destination: String) -> Self {
        Self {
            config: Arc::new(config),
            verifier: Arc::new(verifier),
            destination: destination.into(),
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Telnyx Webhook
// =============================================================================

/// Successful webhook response body.
///
/// The `commands` array is always present; unrecognized events produce an
/// empty array, never a missing field.
#[derive(Serialize)]
pub struct CommandResponse {
    pub commands: Vec<Command>,
}

/// Error response body. Carries a short reason string and nothing else.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Telnyx call-event webhook endpoint.
///
/// Takes the request whole rather than using a body extractor so the raw
/// bytes reach signature verification exactly as received.
pub async fn telnyx_webhook(State(state): State<AppState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    match process(&state, &parts.headers, body).await {
        Ok(commands) => (StatusCode::OK, Json(CommandResponse { commands })).into_response(),
        Err(error) => {
            warn!(status = %error.status(), error = %error, "telnyx_webhook_rejected");
            error.into_response()
        }
    }
}

/// The verification pipeline, as a pure-ish function for testability.
async fn process(
    state: &AppState,
    headers: &HeaderMap,
    body: Body,
) -> Result<Vec<Command>, WebhookError> {
    // Header checks come before any body read or cryptographic work.
    let signature = require_header(headers, SIGNATURE_HEADER)?;
    let timestamp = require_header(headers, TIMESTAMP_HEADER)?;

    let raw_body = capture_raw_body(headers, body, state.config.max_body_bytes).await?;
    info!(body_bytes = raw_body.len(), "telnyx_webhook_received");

    match state.verifier.verify(timestamp, signature, &raw_body) {
        VerificationOutcome::Valid => {}
        VerificationOutcome::Invalid => return Err(WebhookError::InvalidSignature),
        VerificationOutcome::Malformed(reason) => return Err(WebhookError::Malformed(reason)),
    }

    // Only verified bytes are ever parsed for business logic.
    let event = CallEvent::from_slice(&raw_body)
        .map_err(|_| WebhookError::Malformed("invalid JSON payload".to_string()))?;

    let commands = dispatch(&event, &state.destination);
    info!(
        event_type = event.event_type().unwrap_or("unknown"),
        command_count = commands.len(),
        "telnyx_event_dispatched"
    );

    Ok(commands)
}

/// Fetch a required header as a string.
fn require_header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, WebhookError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .ok_or(WebhookError::MissingHeaders)
}

/// Capture the exact request body bytes, bounded by the configured limit.
///
/// `content-length` must be declared and within the limit before any bytes
/// are read; the actual read is capped as well in case the declaration lies.
async fn capture_raw_body(
    headers: &HeaderMap,
    body: Body,
    limit: usize,
) -> Result<Bytes, WebhookError> {
    let declared: usize = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .ok_or(WebhookError::MissingHeaders)?
        .parse()
        .map_err(|_| WebhookError::Malformed("invalid content-length".to_string()))?;

    if declared > limit {
        return Err(WebhookError::Malformed("body too large".to_string()));
    }

    axum::body::to_bytes(body, limit)
        .await
        .map_err(|_| WebhookError::Malformed("body too large".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::{signed_message, CanonicalizationPolicy};
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use ed25519_dalek::{Signer, SigningKey};
    use rand::rngs::OsRng;
    use serde_json::{json, Value};

    const TIMESTAMP: &str = "1700000000";
    const INITIATED_BODY: &str = r#"{"data":{"event_type":"call.initiated"}}"#;
    const HANGUP_BODY: &str = r#"{"data":{"event_type":"call.hangup"}}"#;
    const DESTINATION: &str = "sip:agent@example.com";

    struct Harness {
        signing_key: SigningKey,
        state: AppState,
    }

    fn harness(policy: CanonicalizationPolicy) -> Harness {
        let signing_key = SigningKey::generate(&mut OsRng);
        let public_key = BASE64.encode(signing_key.verifying_key().to_bytes());
        let config = Config {
            signature_policy: policy,
            ..Config::default()
        };
        let verifier = WebhookVerifier::new(&public_key, policy, None).unwrap();
        let state = AppState::new(config, verifier, DESTINATION.to_string());
        Harness { signing_key, state }
    }

    impl Harness {
        fn sign(&self, timestamp: &str, body: &str) -> String {
            let message = signed_message(
                self.state.config.signature_policy,
                timestamp,
                body.as_bytes(),
            );
            BASE64.encode(self.signing_key.sign(&message).to_bytes())
        }
    }

    fn request(
        signature: Option<&str>,
        timestamp: Option<&str>,
        content_length: Option<usize>,
        body: &str,
    ) -> Request {
        let mut builder = Request::builder().method("POST").uri("/webhooks/telnyx");
        if let Some(signature) = signature {
            builder = builder.header(SIGNATURE_HEADER, signature);
        }
        if let Some(timestamp) = timestamp {
            builder = builder.header(TIMESTAMP_HEADER, timestamp);
        }
        if let Some(length) = content_length {
            builder = builder.header(header::CONTENT_LENGTH, length);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn send(state: &AppState, req: Request) -> (StatusCode, Value) {
        let response = telnyx_webhook(State(state.clone()), req).await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_call_initiated_answers_and_connects() {
        let harness = harness(CanonicalizationPolicy::CanonicalJson);
        let signature = harness.sign(TIMESTAMP, INITIATED_BODY);
        let req = request(
            Some(&signature),
            Some(TIMESTAMP),
            Some(INITIATED_BODY.len()),
            INITIATED_BODY,
        );

        let (status, body) = send(&harness.state, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "commands": [
                    {"type": "answer"},
                    {"type": "connect", "to": DESTINATION},
                ]
            })
        );
    }

    #[tokio::test]
    async fn test_unrecognized_event_returns_empty_commands() {
        let harness = harness(CanonicalizationPolicy::CanonicalJson);
        let signature = harness.sign(TIMESTAMP, HANGUP_BODY);
        let req = request(
            Some(&signature),
            Some(TIMESTAMP),
            Some(HANGUP_BODY.len()),
            HANGUP_BODY,
        );

        let (status, body) = send(&harness.state, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"commands": []}));
    }

    #[tokio::test]
    async fn test_tampered_signature_is_forbidden() {
        let harness = harness(CanonicalizationPolicy::CanonicalJson);
        let signature = harness.sign(TIMESTAMP, INITIATED_BODY);
        let mut bytes = BASE64.decode(&signature).unwrap();
        bytes[0] ^= 0x01;
        let tampered = BASE64.encode(&bytes);
        let req = request(
            Some(&tampered),
            Some(TIMESTAMP),
            Some(INITIATED_BODY.len()),
            INITIATED_BODY,
        );

        let (status, body) = send(&harness.state, req).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body, json!({"error": "Invalid signature"}));
    }

    #[tokio::test]
    async fn test_missing_signature_header_is_rejected() {
        let harness = harness(CanonicalizationPolicy::CanonicalJson);
        let req = request(
            None,
            Some(TIMESTAMP),
            Some(INITIATED_BODY.len()),
            INITIATED_BODY,
        );

        let (status, _) = send(&harness.state, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_timestamp_header_is_rejected() {
        let harness = harness(CanonicalizationPolicy::CanonicalJson);
        let signature = harness.sign(TIMESTAMP, INITIATED_BODY);
        let req = request(
            Some(&signature),
            None,
            Some(INITIATED_BODY.len()),
            INITIATED_BODY,
        );

        let (status, _) = send(&harness.state, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_content_length_is_rejected() {
        let harness = harness(CanonicalizationPolicy::CanonicalJson);
        let signature = harness.sign(TIMESTAMP, INITIATED_BODY);
        let req = request(Some(&signature), Some(TIMESTAMP), None, INITIATED_BODY);

        let (status, _) = send(&harness.state, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_oversized_declared_body_is_rejected() {
        let harness = harness(CanonicalizationPolicy::CanonicalJson);
        let signature = harness.sign(TIMESTAMP, INITIATED_BODY);
        let oversize = harness.state.config.max_body_bytes + 1;
        let req = request(
            Some(&signature),
            Some(TIMESTAMP),
            Some(oversize),
            INITIATED_BODY,
        );

        let (status, body) = send(&harness.state, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "body too large"}));
    }

    #[tokio::test]
    async fn test_garbage_signature_encoding_is_rejected() {
        let harness = harness(CanonicalizationPolicy::CanonicalJson);
        let req = request(
            Some("!!! not base64 !!!"),
            Some(TIMESTAMP),
            Some(INITIATED_BODY.len()),
            INITIATED_BODY,
        );

        let (status, _) = send(&harness.state, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_verified_non_json_body_is_rejected_as_malformed() {
        // The canonical-json policy falls back to raw bytes, so a non-JSON
        // body can carry a valid signature; it must still 400 at parsing.
        let harness = harness(CanonicalizationPolicy::CanonicalJson);
        let body = "not json at all";
        let signature = harness.sign(TIMESTAMP, body);
        let req = request(Some(&signature), Some(TIMESTAMP), Some(body.len()), body);

        let (status, response) = send(&harness.state, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response, json!({"error": "invalid JSON payload"}));
    }

    #[tokio::test]
    async fn test_raw_policy_round_trip() {
        let harness = harness(CanonicalizationPolicy::Raw);
        let signature = harness.sign(TIMESTAMP, INITIATED_BODY);
        let req = request(
            Some(&signature),
            Some(TIMESTAMP),
            Some(INITIATED_BODY.len()),
            INITIATED_BODY,
        );

        let (status, body) = send(&harness.state, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["commands"][0], json!({"type": "answer"}));
    }

    #[tokio::test]
    async fn test_health() {
        let response = health().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
