// ── Synchronizer ──
//
// Full async lifecycle of account synchronization: version gate, ontology
// resolution, export to the asset platform, and committing the result.
// The scheduler runs one cycle per due account, never two at once for the
// same account.

pub mod gate;
mod live;
pub mod store;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use bosync_api::{SubscriptionTopic, webhook_url};

use crate::config::{AccountConfig, AccountId, ConfigStore};
use crate::error::CoreError;
use crate::ontology::resolve_ontology;
use crate::platform::{AssetPlatform, OntologySource, Subscriber, VendorConnector};

pub use gate::{RunGuard, RunOnceGate, VersionCheck, VersionGate};
pub use live::{ApplyReport, LiveUpdate};
pub use store::{AccountState, CommittedOntology, DatapointBinding, Snapshot};

/// How often the scheduler looks for due accounts.
pub const SCHEDULER_TICK: Duration = Duration::from_secs(30);

/// What one rebuild did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub version: i32,
    pub asset_types: usize,
    pub nodes: usize,
    pub assets_created: usize,
    pub datapoints: usize,
    pub warnings: usize,
}

/// Result of a synchronization request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Account is disabled; it was marked inactive.
    Disabled,
    /// Another run for the account is in flight.
    AlreadyRunning,
    /// Remote version equals the committed one.
    UpToDate { version: i32 },
    Synced(SyncSummary),
}

impl SyncOutcome {
    /// Whether the cycle reached the vendor and finished.
    pub fn completed(&self) -> bool {
        matches!(self, Self::UpToDate { .. } | Self::Synced(_))
    }
}

/// Drives synchronization for every configured account.
///
/// Cheaply cloneable: all state lives behind an `Arc`.
pub struct Synchronizer<V, P, S> {
    inner: Arc<SyncInner<V, P, S>>,
}

impl<V, P, S> Clone for Synchronizer<V, P, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct SyncInner<V, P, S> {
    connector: V,
    platform: P,
    store: S,
    gate: RunOnceGate,
    accounts: DashMap<AccountId, Arc<AccountState>>,
    next_due: DashMap<AccountId, Instant>,
}

impl<V, P, S> Synchronizer<V, P, S>
where
    V: VendorConnector,
    P: AssetPlatform,
    S: ConfigStore,
{
    pub fn new(connector: V, platform: P, store: S) -> Self {
        Self {
            inner: Arc::new(SyncInner {
                connector,
                platform,
                store,
                gate: RunOnceGate::new(),
                accounts: DashMap::new(),
                next_due: DashMap::new(),
            }),
        }
    }

    pub fn platform(&self) -> &P {
        &self.inner.platform
    }

    pub fn config_store(&self) -> &S {
        &self.inner.store
    }

    /// State of one account, created empty on first use.
    pub fn account_state(&self, id: AccountId) -> Arc<AccountState> {
        Arc::clone(
            self.inner
                .accounts
                .entry(id)
                .or_insert_with(|| Arc::new(AccountState::new()))
                .value(),
        )
    }

    pub fn is_running(&self, id: AccountId) -> bool {
        self.inner.gate.is_running(id)
    }

    // ── Single account ───────────────────────────────────────────────

    /// Rebuild the account's tree if its ontology version changed.
    pub async fn sync_account(&self, id: AccountId) -> Result<SyncOutcome, CoreError> {
        self.execute(id, false).await
    }

    /// One scheduled cycle: rebuild, then (re)subscribe the webhooks.
    ///
    /// Subscription failures are logged and never fail the cycle.
    pub async fn run_cycle(&self, id: AccountId) -> Result<SyncOutcome, CoreError> {
        self.execute(id, true).await
    }

    async fn execute(&self, id: AccountId, subscribe: bool) -> Result<SyncOutcome, CoreError> {
        let account = self.inner.store.account(id)?;
        if !account.enable {
            self.inner.store.set_active(id, false)?;
            debug!(account = %id, "account disabled, skipping");
            return Ok(SyncOutcome::Disabled);
        }

        let Some(_guard) = self.inner.gate.try_acquire(id) else {
            debug!(account = %id, "synchronization already running");
            return Ok(SyncOutcome::AlreadyRunning);
        };

        if !self.inner.store.is_active(id)? {
            self.inner.store.set_active(id, true)?;
            info!(account = %id, "account activated");
        }

        let client = self.inner.connector.connect(&account)?;
        let outcome = self.rebuild(&account, &client).await?;

        if subscribe {
            subscribe_all(&account, &client).await;
        }
        Ok(outcome)
    }

    async fn rebuild(
        &self,
        account: &AccountConfig,
        source: &impl OntologySource,
    ) -> Result<SyncOutcome, CoreError> {
        let id = account.id;
        let committed = self.inner.store.ontology_version(id)?;

        let (version, ontology) = match VersionGate::check(source, committed).await? {
            VersionCheck::NoUpdate { version } => {
                debug!(account = %id, version, "ontology up to date");
                return Ok(SyncOutcome::UpToDate { version });
            }
            VersionCheck::Changed { version, ontology } => (version, ontology),
        };
        info!(account = %id, version, ?committed, "rebuilding asset tree");

        let resolved = resolve_ontology(&ontology, &account.asset_filter)?;

        for asset_type in &resolved.asset_types {
            self.inner.platform.upsert_asset_type(asset_type).await?;
        }

        let mut asset_ids: HashMap<String, Vec<i64>> = HashMap::new();
        let mut assets_created = 0;
        for project_id in &account.project_ids {
            let creation = self
                .inner
                .platform
                .create_assets(project_id, &resolved.root)
                .await?;
            if creation.created > 0 {
                self.inner
                    .platform
                    .notify_assets_created(project_id, creation.created)
                    .await?;
            }
            assets_created += creation.created;
            for (gai, asset_id) in creation.asset_ids {
                asset_ids.entry(gai).or_default().push(asset_id);
            }
        }

        let asset_types = resolved.asset_types.len();
        let nodes = resolved.root.node_count();
        let warnings = resolved.report.len();

        let state = self.account_state(id);
        state.commit(
            CommittedOntology {
                version,
                asset_types: resolved.asset_types,
                root: resolved.root,
                report: resolved.report,
                committed_at: Utc::now(),
            },
            &asset_ids,
        );
        self.inner.store.commit_ontology_version(id, version)?;

        let summary = SyncSummary {
            version,
            asset_types,
            nodes,
            assets_created,
            datapoints: state.datapoint_count(),
            warnings,
        };
        info!(
            account = %id,
            version,
            nodes = summary.nodes,
            created = summary.assets_created,
            warnings = summary.warnings,
            "asset tree committed"
        );
        Ok(SyncOutcome::Synced(summary))
    }

    // ── Scheduler ────────────────────────────────────────────────────

    /// Run cycles for every due account until cancelled.
    ///
    /// Each account is run again `refresh_interval` after a completed
    /// cycle; a failed cycle is retried on the next tick.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(SCHEDULER_TICK);
        let mut warned_empty = false;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    match self.inner.store.accounts() {
                        Ok(accounts) if accounts.is_empty() => {
                            if !warned_empty {
                                warn!("no accounts configured");
                                warned_empty = true;
                            }
                        }
                        Ok(accounts) => {
                            warned_empty = false;
                            self.spawn_due(&accounts);
                        }
                        Err(e) => error!(error = %e, "failed to list accounts"),
                    }
                }
            }
        }
        debug!("scheduler stopped");
    }

    fn spawn_due(&self, accounts: &[AccountConfig]) {
        let now = Instant::now();
        for account in accounts {
            let due = self.inner.next_due.get(&account.id).is_none_or(|at| *at <= now);
            if !due || self.is_running(account.id) {
                continue;
            }

            let this = self.clone();
            let id = account.id;
            let refresh = account.refresh_interval;
            // Parked until the task reports back.
            self.inner.next_due.insert(id, now + refresh);
            tokio::spawn(async move {
                match this.run_cycle(id).await {
                    Ok(outcome) => {
                        debug!(account = %id, ?outcome, "cycle finished");
                        this.inner.next_due.insert(id, Instant::now() + refresh);
                    }
                    Err(e) => {
                        error!(account = %id, error = %e, "cycle failed, retrying next tick");
                        this.inner.next_due.insert(id, Instant::now());
                    }
                }
            });
        }
    }
}

async fn subscribe_all(account: &AccountConfig, client: &impl Subscriber) {
    let Some(base) = &account.webhook_base_url else {
        debug!(account = %account.id, "no webhook base URL, skipping subscriptions");
        return;
    };

    for topic in SubscriptionTopic::ALL {
        let url = match webhook_url(base, account.id.0, topic) {
            Ok(url) => url,
            Err(e) => {
                warn!(account = %account.id, %topic, error = %e, "invalid webhook URL");
                continue;
            }
        };
        if let Err(e) = client.subscribe(topic, &url).await {
            warn!(account = %account.id, %topic, error = %e, "subscription failed");
        }
    }
}
