//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use bosync_config::ConfigError;
use bosync_core::{CoreError, LookupKind};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to gateway at {url}")]
    #[diagnostic(
        code(bosync::connection_failed),
        help(
            "Check the api_url of the account and your network.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(bosync::auth_failed),
        help("Verify client_id, the client secret, and token_url of the account.")
    )]
    AuthFailed { message: String },

    #[error("No client secret configured for account '{account}'")]
    #[diagnostic(
        code(bosync::no_credentials),
        help(
            "Set client_secret_env in the profile and export that variable,\n\
             or store the secret in the system keyring under service 'bosync',\n\
             user '{account}/client-secret'."
        )
    )]
    NoCredentials { account: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(code(bosync::not_found), help("Run: bosync {list_command}"))]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("{resource_type} '{identifier}' already exists")]
    #[diagnostic(code(bosync::conflict), help("Use --force to replace it."))]
    Conflict {
        resource_type: String,
        identifier: String,
    },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error ({code}): {message}")]
    #[diagnostic(code(bosync::api_error))]
    ApiError { code: String, message: String },

    #[error("Synchronization failed: {message}")]
    #[diagnostic(code(bosync::sync_failed))]
    SyncFailed { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(bosync::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("No accounts configured")]
    #[diagnostic(
        code(bosync::no_accounts),
        help(
            "Add one with: bosync config init --name <NAME> --id <ID> ...\n\
             Expected at: {path}"
        )
    )]
    NoAccounts { path: String },

    #[error(transparent)]
    #[diagnostic(code(bosync::config))]
    Config(Box<ConfigError>),

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(bosync::timeout),
        help("Increase timeout in the profile or check gateway responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(bosync::json), help("Check the JSON file contents and try again."))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NoAccounts { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { account } => CliError::NoCredentials { account },
            other => CliError::Config(Box::new(other)),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => {
                CliError::ConnectionFailed { url, reason }
            }

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::Api { message, status } => CliError::ApiError {
                code: status.map_or_else(|| "gateway".into(), |s| s.to_string()),
                message,
            },

            CoreError::Platform { operation, message } => CliError::ApiError {
                code: operation,
                message,
            },

            CoreError::LookupMiss {
                kind: LookupKind::Account,
                id,
            } => CliError::NotFound {
                resource_type: "account".into(),
                identifier: id,
                list_command: "config show".into(),
            },

            CoreError::LookupMiss { kind, id } => CliError::SyncFailed {
                message: format!("unknown {kind} {id}"),
            },

            CoreError::InvalidFilter { pattern, reason } => CliError::Validation {
                field: "filter".into(),
                reason: format!("{pattern:?}: {reason}"),
            },

            CoreError::InvalidPayload { message } => CliError::Validation {
                field: "payload".into(),
                reason: message,
            },

            CoreError::Config { message } | CoreError::Store { message } => {
                CliError::Validation {
                    field: "config".into(),
                    reason: message,
                }
            }

            CoreError::DataInconsistency { message } | CoreError::Internal(message) => {
                CliError::SyncFailed { message }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_exit_codes() {
        let cases = [
            (
                CoreError::AuthenticationFailed {
                    message: "bad secret".into(),
                },
                exit_code::AUTH,
            ),
            (CoreError::Timeout { timeout_secs: 10 }, exit_code::TIMEOUT),
            (
                CoreError::LookupMiss {
                    kind: LookupKind::Account,
                    id: "9".into(),
                },
                exit_code::NOT_FOUND,
            ),
            (
                CoreError::InvalidFilter {
                    pattern: "[".into(),
                    reason: "unclosed".into(),
                },
                exit_code::USAGE,
            ),
            (
                CoreError::DataInconsistency {
                    message: "x".into(),
                },
                exit_code::GENERAL,
            ),
        ];
        for (core, code) in cases {
            assert_eq!(CliError::from(core).exit_code(), code);
        }
    }

    #[test]
    fn missing_secret_is_an_auth_error() {
        let err = CliError::from(ConfigError::NoCredentials {
            account: "plant".into(),
        });
        assert_eq!(err.exit_code(), exit_code::AUTH);
        assert_eq!(err.to_string(), "No client secret configured for account 'plant'");
    }
}
