// ── Runtime account configuration ──
//
// These types describe one vendor account (a gateway plus credentials) and
// how it is synchronized. They never touch disk: `bosync-config` or a test
// builds an `AccountConfig` and hands it to a `ConfigStore`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CoreError, LookupKind};
use crate::model::AssetFilter;

pub use bosync_api::DEFAULT_TOKEN_SCOPE;

/// Numeric account identifier. Also the first webhook path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub i64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Connection and synchronization settings for one account.
#[derive(Debug, Clone)]
pub struct AccountConfig {
    pub id: AccountId,
    pub gateway_id: String,
    pub client_id: String,
    pub client_secret: SecretString,
    /// API base URL, without the `gateway/{id}` segment.
    pub api_base_url: Url,
    pub token_url: Url,
    pub token_scope: String,
    /// Public base URL the gateway calls back. `None` disables subscriptions.
    pub webhook_base_url: Option<Url>,
    pub enable: bool,
    /// Pause between two scheduled synchronizations.
    pub refresh_interval: Duration,
    pub request_timeout: Duration,
    /// Platform projects the asset tree is created in.
    pub project_ids: Vec<String>,
    pub asset_filter: AssetFilter,
}

impl AccountConfig {
    pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60 * 60);
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// An enabled account with default intervals, no projects, and no filter.
    pub fn new(
        id: AccountId,
        gateway_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: SecretString,
        api_base_url: Url,
        token_url: Url,
    ) -> Self {
        Self {
            id,
            gateway_id: gateway_id.into(),
            client_id: client_id.into(),
            client_secret,
            api_base_url,
            token_url,
            token_scope: DEFAULT_TOKEN_SCOPE.to_owned(),
            webhook_base_url: None,
            enable: true,
            refresh_interval: Self::DEFAULT_REFRESH_INTERVAL,
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
            project_ids: Vec::new(),
            asset_filter: AssetFilter::default(),
        }
    }
}

// ── Store ────────────────────────────────────────────────────────────

/// Persisted account settings and synchronization markers.
pub trait ConfigStore: Send + Sync + 'static {
    fn accounts(&self) -> Result<Vec<AccountConfig>, CoreError>;

    fn account(&self, id: AccountId) -> Result<AccountConfig, CoreError>;

    /// Last committed ontology version, `None` before the first sync.
    fn ontology_version(&self, id: AccountId) -> Result<Option<i32>, CoreError>;

    fn commit_ontology_version(&self, id: AccountId, version: i32) -> Result<(), CoreError>;

    fn set_active(&self, id: AccountId, active: bool) -> Result<(), CoreError>;

    fn is_active(&self, id: AccountId) -> Result<bool, CoreError>;
}

#[derive(Debug, Clone)]
struct AccountRecord {
    config: AccountConfig,
    ontology_version: Option<i32>,
    active: bool,
}

/// In-memory `ConfigStore`.
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigStore {
    records: Arc<DashMap<AccountId, AccountRecord>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an account. Replacing keeps the committed version.
    pub fn upsert(&self, config: AccountConfig) {
        self.records
            .entry(config.id)
            .and_modify(|r| r.config = config.clone())
            .or_insert_with(|| AccountRecord {
                config,
                ontology_version: None,
                active: false,
            });
    }

    pub fn remove(&self, id: AccountId) -> bool {
        self.records.remove(&id).is_some()
    }

    fn missing(id: AccountId) -> CoreError {
        CoreError::LookupMiss {
            kind: LookupKind::Account,
            id: id.to_string(),
        }
    }
}

impl ConfigStore for MemoryConfigStore {
    fn accounts(&self) -> Result<Vec<AccountConfig>, CoreError> {
        let mut accounts: Vec<AccountConfig> =
            self.records.iter().map(|r| r.config.clone()).collect();
        accounts.sort_by_key(|a| a.id);
        Ok(accounts)
    }

    fn account(&self, id: AccountId) -> Result<AccountConfig, CoreError> {
        self.records
            .get(&id)
            .map(|r| r.config.clone())
            .ok_or_else(|| Self::missing(id))
    }

    fn ontology_version(&self, id: AccountId) -> Result<Option<i32>, CoreError> {
        self.records
            .get(&id)
            .map(|r| r.ontology_version)
            .ok_or_else(|| Self::missing(id))
    }

    fn commit_ontology_version(&self, id: AccountId, version: i32) -> Result<(), CoreError> {
        let mut record = self.records.get_mut(&id).ok_or_else(|| Self::missing(id))?;
        record.ontology_version = Some(version);
        Ok(())
    }

    fn set_active(&self, id: AccountId, active: bool) -> Result<(), CoreError> {
        let mut record = self.records.get_mut(&id).ok_or_else(|| Self::missing(id))?;
        record.active = active;
        Ok(())
    }

    fn is_active(&self, id: AccountId) -> Result<bool, CoreError> {
        self.records
            .get(&id)
            .map(|r| r.active)
            .ok_or_else(|| Self::missing(id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn account(id: i64) -> AccountConfig {
        AccountConfig::new(
            AccountId(id),
            "gw-1",
            "client",
            "secret".to_string().into(),
            Url::parse("https://api.example/proxy/v1").unwrap(),
            Url::parse("https://login.example/token").unwrap(),
        )
    }

    #[test]
    fn upsert_keeps_committed_version() {
        let store = MemoryConfigStore::new();
        store.upsert(account(1));
        store.commit_ontology_version(AccountId(1), 9).unwrap();

        let mut changed = account(1);
        changed.enable = false;
        store.upsert(changed);

        assert_eq!(store.ontology_version(AccountId(1)).unwrap(), Some(9));
        assert!(!store.account(AccountId(1)).unwrap().enable);
    }

    #[test]
    fn accounts_are_sorted_and_missing_ids_fail() {
        let store = MemoryConfigStore::new();
        store.upsert(account(3));
        store.upsert(account(1));

        let ids: Vec<_> = store.accounts().unwrap().iter().map(|a| a.id.0).collect();
        assert_eq!(ids, [1, 3]);

        let err = store.set_active(AccountId(2), true).unwrap_err();
        assert!(matches!(err, CoreError::LookupMiss { kind: LookupKind::Account, .. }));
    }
}
