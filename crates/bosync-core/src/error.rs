// ── Core error types ──
//
// Errors surfaced by the engine. Resolution-time problems (missing units,
// unknown templates) never reach this type: they are recovered in place
// and recorded in a `BuildReport`. What remains here aborts the current
// operation. The `From<bosync_api::Error>` impl translates transport-layer
// errors into the engine's taxonomy.

use strum::Display;
use thiserror::Error;

/// Which kind of identifier a lookup failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum LookupKind {
    DataType,
    Unit,
    Template,
    Datapoint,
    Asset,
    Account,
    AlarmRule,
    Attribute,
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Transport errors ─────────────────────────────────────────────
    #[error("Cannot connect to gateway at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Gateway request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    /// An outbound platform call failed.
    #[error("Platform operation {operation} failed: {message}")]
    Platform { operation: String, message: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Unknown {kind}: {id}")]
    LookupMiss { kind: LookupKind, id: String },

    #[error("Data inconsistency: {message}")]
    DataInconsistency { message: String },

    #[error("Invalid filter pattern {pattern:?}: {reason}")]
    InvalidFilter { pattern: String, reason: String },

    #[error("Invalid webhook payload: {message}")]
    InvalidPayload { message: String },

    // ── Store / configuration errors ─────────────────────────────────
    #[error("Configuration store error: {message}")]
    Store { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Errors that abort a synchronization cycle and are retried on the
    /// next scheduled run.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. }
                | Self::AuthenticationFailed { .. }
                | Self::Timeout { .. }
                | Self::Api { .. }
                | Self::Platform { .. }
        )
    }

    pub(crate) fn lookup(kind: LookupKind, id: impl Into<String>) -> Self {
        Self::LookupMiss {
            kind,
            id: id.into(),
        }
    }

    pub(crate) fn inconsistent(message: impl Into<String>) -> Self {
        Self::DataInconsistency {
            message: message.into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<bosync_api::Error> for CoreError {
    fn from(err: bosync_api::Error) -> Self {
        match err {
            bosync_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            bosync_api::Error::TokenExpired => CoreError::AuthenticationFailed {
                message: "Access token expired -- re-authentication required".into(),
            },
            bosync_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            bosync_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            bosync_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            bosync_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            bosync_api::Error::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            bosync_api::Error::Rejected { failures } => {
                let detail = failures
                    .iter()
                    .map(|f| format!("{}: {} {}", f.id, f.error_code, f.inner_error))
                    .collect::<Vec<_>>()
                    .join("; ");
                CoreError::Api {
                    message: format!("live data write rejected ({detail})"),
                    status: None,
                }
            }
            bosync_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
