//! Command handlers and the shared engine setup.

pub mod config_cmd;
pub mod inspect;
pub mod run;
pub mod sync;

use std::path::PathBuf;

use bosync_config::Config;
use bosync_core::{AccountId, ApiConnector, MemoryConfigStore, Synchronizer};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::platform::DryRunPlatform;

/// The synchronizer as the binary runs it.
pub type Engine = Synchronizer<ApiConnector, DryRunPlatform, MemoryConfigStore>;

/// `--config` if given, else the platform default.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(bosync_config::config_path)
}

pub fn load_config(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(bosync_config::load_config_from(&config_path(global))?)
}

/// Load every configured account into a fresh engine.
pub fn build_engine(global: &GlobalOpts) -> Result<(Engine, Vec<AccountId>), CliError> {
    let config = load_config(global)?;
    let accounts = bosync_config::accounts_from_config(&config)?;
    if accounts.is_empty() {
        return Err(CliError::NoAccounts {
            path: config_path(global).display().to_string(),
        });
    }

    let store = MemoryConfigStore::new();
    let ids = accounts.iter().map(|a| a.id).collect();
    for account in accounts {
        store.upsert(account);
    }

    Ok((
        Synchronizer::new(ApiConnector, DryRunPlatform::new(), store),
        ids,
    ))
}
