use thiserror::Error;

use crate::models::LiveDataWriteResult;

/// Top-level error type for the `bosync-api` crate.
///
/// Covers every failure mode of the gateway surface: token exchange,
/// transport, non-success responses, and per-item write rejections.
/// `bosync-core` maps these into its own taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Token exchange failed or the gateway rejected the bearer token.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Cached token expired and the gateway answered 401.
    #[error("Access token expired -- re-authentication required")]
    TokenExpired,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The HTTP client (and its TLS backend) could not be built.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Gateway API ─────────────────────────────────────────────────
    /// Non-success status from the gateway.
    #[error("Gateway API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Live-data write accepted at the HTTP level but rejected per item.
    #[error("{} live data write(s) rejected", failures.len())]
    Rejected { failures: Vec<LiveDataWriteResult> },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this error indicates auth has expired
    /// and re-authentication might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Authentication { .. } | Self::TokenExpired)
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Api { status: 404, .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_gateway_statuses() {
        let unavailable = Error::Api {
            status: 503,
            message: "busy".into(),
        };
        assert!(unavailable.is_transient());
        assert!(!unavailable.is_not_found());

        let missing = Error::Api {
            status: 404,
            message: "no such gateway".into(),
        };
        assert!(missing.is_not_found());
        assert!(!missing.is_transient());
    }

    #[test]
    fn rejected_message_counts_failures() {
        let err = Error::Rejected {
            failures: vec![
                LiveDataWriteResult {
                    id: "dp-1".into(),
                    error_code: "ReadOnly".into(),
                    inner_error: String::new(),
                },
                LiveDataWriteResult {
                    id: "dp-2".into(),
                    error_code: "OutOfRange".into(),
                    inner_error: String::new(),
                },
            ],
        };
        assert_eq!(err.to_string(), "2 live data write(s) rejected");
        assert!(!err.is_auth_expired());
    }
}
