//! Configuration module for environment variable parsing.
//!
//! Reads all configuration from environment variables. Values that are
//! required for serving (public key, connect destination) stay `Option`
//! here; the binary validates them at startup and refuses to serve
//! without them.

use std::env;
use tracing::warn;

use crate::canonical::CanonicalizationPolicy;

/// Default cap on request body size: 1 MiB.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Base64-encoded raw 32-byte Ed25519 public key from the Telnyx portal
    pub telnyx_public_key: Option<String>,

    /// SIP destination the `connect` command routes answered calls to
    pub connect_destination: Option<String>,

    /// How the signed message is reconstructed from timestamp + body
    pub signature_policy: CanonicalizationPolicy,

    /// Maximum request body size in bytes
    pub max_body_bytes: usize,

    /// Maximum age in seconds for webhook timestamps; None disables the check
    pub signature_max_age: Option<u64>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),

            telnyx_public_key: env::var("TELNYX_PUBLIC_KEY").ok(),

            connect_destination: env::var("CONNECT_DESTINATION").ok(),

            signature_policy: parse_policy("SIGNATURE_POLICY"),

            max_body_bytes: env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_BODY_BYTES),

            signature_max_age: env::var("SIGNATURE_MAX_AGE")
                .ok()
                .and_then(|v| v.parse().ok()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            telnyx_public_key: None,
            connect_destination: None,
            signature_policy: CanonicalizationPolicy::CanonicalJson,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            signature_max_age: None,
        }
    }
}

/// Parse a canonicalization policy, defaulting to canonical-json.
fn parse_policy(name: &str) -> CanonicalizationPolicy {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return CanonicalizationPolicy::CanonicalJson,
    };

    match raw.parse() {
        Ok(policy) => policy,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid signature policy, using canonical-json");
            CanonicalizationPolicy::CanonicalJson
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_policy_default() {
        assert_eq!(
            parse_policy("NONEXISTENT_POLICY_VAR"),
            CanonicalizationPolicy::CanonicalJson
        );
    }

    #[test]
    fn test_parse_policy_raw() {
        env::set_var("TEST_SIGNATURE_POLICY", "raw");
        assert_eq!(
            parse_policy("TEST_SIGNATURE_POLICY"),
            CanonicalizationPolicy::Raw
        );
        env::remove_var("TEST_SIGNATURE_POLICY");
    }

    #[test]
    fn test_parse_policy_invalid_falls_back() {
        env::set_var("TEST_BAD_POLICY", "minified");
        assert_eq!(
            parse_policy("TEST_BAD_POLICY"),
            CanonicalizationPolicy::CanonicalJson
        );
        env::remove_var("TEST_BAD_POLICY");
    }

    #[test]
    fn test_default_body_limit() {
        let config = Config::default();
        assert_eq!(config.max_body_bytes, 1024 * 1024);
        assert!(config.signature_max_age.is_none());
    }
}
