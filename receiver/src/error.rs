//! Typed request outcomes.
//!
//! Every failure mode of the webhook pipeline is a value of `WebhookError`,
//! threaded through with `?` rather than caught at an outer boundary. The
//! response emitter maps each variant to exactly one status code, so the
//! total-response guarantee is checkable by inspection.

use axum::http::StatusCode;
use thiserror::Error;

/// Failure modes of a single webhook request.
///
/// Display strings become the `error` field of the JSON response body and
/// must never contain cryptographic material or payload contents.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// A required header (signature, timestamp, content-length) is absent;
    /// rejected before any body read or cryptographic work.
    #[error("Missing required headers")]
    MissingHeaders,

    /// Body or signature could not be decoded into a verifiable form.
    #[error("{0}")]
    Malformed(String),

    /// Signature decoded fine but did not verify. The body deliberately
    /// does not say which check failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Anything unexpected; logged server-side, generic body returned.
    #[error("Internal server error")]
    Internal,
}

impl WebhookError {
    /// HTTP status for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            WebhookError::MissingHeaders => StatusCode::BAD_REQUEST,
            WebhookError::Malformed(_) => StatusCode::BAD_REQUEST,
            WebhookError::InvalidSignature => StatusCode::FORBIDDEN,
            WebhookError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(WebhookError::MissingHeaders.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            WebhookError::Malformed("body too large".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(WebhookError::InvalidSignature.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            WebhookError::Internal.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_invalid_signature_message_is_generic() {
        assert_eq!(WebhookError::InvalidSignature.to_string(), "Invalid signature");
    }
}
