//! Configuration for bosync.
//!
//! TOML account profiles, credential resolution (env + keyring + plaintext),
//! and translation to `bosync_core::AccountConfig`.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use bosync_core::{AccountConfig, AccountId, AssetFilter};

const KEYRING_SERVICE: &str = "bosync";
const ENV_PREFIX: &str = "BOSYNC_";

const DEFAULT_API_URL: &str = "https://api.buildings.ability.abb/buildings/openbos/apiproxy/v1";
const DEFAULT_TOKEN_URL: &str =
    "https://login.microsoftonline.com/372ee9e0-9ce0-4033-a64a-c07073a91ecd/oauth2/v2.0/token";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no client secret configured for account '{account}'")]
    NoCredentials { account: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Values shared by every account.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named account profiles.
    #[serde(default)]
    pub accounts: BTreeMap<String, AccountProfile>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_token_url")]
    pub token_url: String,

    #[serde(default = "default_token_scope")]
    pub token_scope: String,

    /// Public base URL the gateway posts webhooks to.
    pub webhook_url: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Seconds between scheduled synchronizations.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token_url: default_token_url(),
            token_scope: default_token_scope(),
            webhook_url: None,
            timeout: default_timeout(),
            refresh_interval: default_refresh_interval(),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.into()
}
fn default_token_url() -> String {
    DEFAULT_TOKEN_URL.into()
}
fn default_token_scope() -> String {
    bosync_core::config::DEFAULT_TOKEN_SCOPE.into()
}
fn default_timeout() -> u64 {
    AccountConfig::DEFAULT_REQUEST_TIMEOUT.as_secs()
}
fn default_refresh_interval() -> u64 {
    AccountConfig::DEFAULT_REFRESH_INTERVAL.as_secs()
}
fn default_enable() -> bool {
    true
}

/// One gateway account.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountProfile {
    /// Numeric id, also the webhook path segment.
    pub id: i64,

    pub gateway_id: String,

    pub client_id: String,

    /// Client secret (plaintext, prefer keyring or env var).
    pub client_secret: Option<String>,

    /// Environment variable name containing the client secret.
    pub client_secret_env: Option<String>,

    #[serde(default = "default_enable")]
    pub enable: bool,

    /// Platform projects the asset tree is created in.
    #[serde(default)]
    pub project_ids: Vec<String>,

    /// OR-of-ANDs `{parameter, regex}` groups.
    #[serde(default)]
    pub filter: AssetFilter,

    // Per-account overrides of `[defaults]`.
    pub api_url: Option<String>,
    pub token_url: Option<String>,
    pub webhook_url: Option<String>,
    pub timeout: Option<u64>,
    pub refresh_interval: Option<u64>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "bosync", "bosync").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("bosync");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load config from `path` + environment.
///
/// Environment variables use the `BOSYNC_` prefix and `__` as the nesting
/// separator, e.g. `BOSYNC_DEFAULTS__WEBHOOK_URL`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading configuration");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve a client secret: env var, then system keyring, then plaintext.
pub fn resolve_client_secret(
    profile: &AccountProfile,
    account_name: &str,
) -> Result<SecretString, ConfigError> {
    // 1. Profile's client_secret_env -> env var lookup
    if let Some(ref env_name) = profile.client_secret_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{account_name}/client-secret")) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref secret) = profile.client_secret {
        return Ok(SecretString::from(secret.clone()));
    }

    Err(ConfigError::NoCredentials {
        account: account_name.into(),
    })
}

// ── Translation ─────────────────────────────────────────────────────

fn parse_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
    raw.parse().map_err(|e| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL {raw:?}: {e}"),
    })
}

/// Build an `AccountConfig` from a profile and the shared defaults.
pub fn profile_to_account_config(
    defaults: &Defaults,
    profile: &AccountProfile,
    account_name: &str,
) -> Result<AccountConfig, ConfigError> {
    if profile.id <= 0 {
        return Err(ConfigError::Validation {
            field: format!("accounts.{account_name}.id"),
            reason: format!("must be positive, got {}", profile.id),
        });
    }
    if let Err(e) = profile.filter.compile() {
        return Err(ConfigError::Validation {
            field: format!("accounts.{account_name}.filter"),
            reason: e.to_string(),
        });
    }

    let api_url = parse_url(
        "api_url",
        profile.api_url.as_deref().unwrap_or(&defaults.api_url),
    )?;
    let token_url = parse_url(
        "token_url",
        profile.token_url.as_deref().unwrap_or(&defaults.token_url),
    )?;
    let webhook_base_url = profile
        .webhook_url
        .as_deref()
        .or(defaults.webhook_url.as_deref())
        .map(|raw| parse_url("webhook_url", raw))
        .transpose()?;

    let secret = resolve_client_secret(profile, account_name)?;

    let mut account = AccountConfig::new(
        AccountId(profile.id),
        profile.gateway_id.clone(),
        profile.client_id.clone(),
        secret,
        api_url,
        token_url,
    );
    account.token_scope.clone_from(&defaults.token_scope);
    account.webhook_base_url = webhook_base_url;
    account.enable = profile.enable;
    account.request_timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    account.refresh_interval =
        Duration::from_secs(profile.refresh_interval.unwrap_or(defaults.refresh_interval));
    account.project_ids.clone_from(&profile.project_ids);
    account.asset_filter = profile.filter.clone();
    Ok(account)
}

/// Translate every profile, rejecting duplicate account ids.
pub fn accounts_from_config(config: &Config) -> Result<Vec<AccountConfig>, ConfigError> {
    let mut seen = HashSet::new();
    let mut accounts = Vec::with_capacity(config.accounts.len());
    for (name, profile) in &config.accounts {
        if !seen.insert(profile.id) {
            return Err(ConfigError::Validation {
                field: format!("accounts.{name}.id"),
                reason: format!("id {} is used by another account", profile.id),
            });
        }
        accounts.push(profile_to_account_config(&config.defaults, profile, name)?);
    }
    Ok(accounts)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    const SAMPLE: &str = r#"
[defaults]
webhook_url = "https://hooks.example/bosync"
refresh_interval = 600

[accounts.main]
id = 7
gateway_id = "gw-1"
client_id = "client-a"
client_secret = "plain"
project_ids = ["p-1", "p-2"]
filter = [[{ parameter = "name", regex = "^Floor" }]]

[accounts.lab]
id = 8
gateway_id = "gw-2"
client_id = "client-b"
client_secret = "other"
enable = false
timeout = 3
"#;

    #[test]
    fn loads_profiles_with_defaults() {
        let file = write_config(SAMPLE);
        let config = load_config_from(file.path()).unwrap();

        assert_eq!(config.defaults.api_url, DEFAULT_API_URL);
        assert_eq!(config.defaults.refresh_interval, 600);
        assert_eq!(config.accounts.len(), 2);

        let main = &config.accounts["main"];
        assert_eq!(main.project_ids, ["p-1", "p-2"]);
        assert_eq!(main.filter.0[0][0].parameter, "name");
        assert!(main.enable);
        assert!(!config.accounts["lab"].enable);
    }

    #[test]
    fn profiles_translate_to_account_configs() {
        let file = write_config(SAMPLE);
        let config = load_config_from(file.path()).unwrap();
        let accounts = accounts_from_config(&config).unwrap();

        let lab = accounts.iter().find(|a| a.id == AccountId(8)).unwrap();
        assert_eq!(lab.request_timeout, Duration::from_secs(3));
        assert!(!lab.enable);

        let main = accounts.iter().find(|a| a.id == AccountId(7)).unwrap();
        assert_eq!(main.refresh_interval, Duration::from_secs(600));
        assert_eq!(main.client_secret.expose_secret(), "plain");
        assert_eq!(
            main.webhook_base_url.as_ref().map(Url::as_str),
            Some("https://hooks.example/bosync")
        );
        assert_eq!(main.token_url.as_str(), DEFAULT_TOKEN_URL);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let file = write_config(
            r#"
[accounts.a]
id = 1
gateway_id = "gw"
client_id = "c"
client_secret = "s"

[accounts.b]
id = 1
gateway_id = "gw"
client_id = "c"
client_secret = "s"
"#,
        );
        let config = load_config_from(file.path()).unwrap();
        let err = accounts_from_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn invalid_filter_is_a_validation_error() {
        let file = write_config(
            r#"
[accounts.a]
id = 1
gateway_id = "gw"
client_id = "c"
client_secret = "s"
filter = [[{ parameter = "name", regex = "(" }]]
"#,
        );
        let config = load_config_from(file.path()).unwrap();
        let err = accounts_from_config(&config).unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation { ref field, .. } if field == "accounts.a.filter")
        );
    }

    #[test]
    fn save_then_load_keeps_accounts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let file = write_config(SAMPLE);
        let config = load_config_from(file.path()).unwrap();
        save_config_to(&config, &path).unwrap();

        let reloaded = load_config_from(&path).unwrap();
        assert_eq!(
            reloaded.accounts.keys().collect::<Vec<_>>(),
            config.accounts.keys().collect::<Vec<_>>()
        );
        assert_eq!(reloaded.accounts["main"].filter, config.accounts["main"].filter);
    }
}
