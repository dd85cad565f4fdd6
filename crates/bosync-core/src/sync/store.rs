// ── Committed synchronization state ──
//
// One `AccountState` per account holds the last committed tree and the
// registries derived from it. The tree and its registries form one
// immutable `Snapshot`; a commit publishes a new snapshot with a single
// store, so readers see either the old registries or the new ones.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::watch;

use crate::model::{AssetType, ResolvedNode, Subtype};
use crate::ontology::BuildReport;

/// The tree and types last exported for an account.
#[derive(Debug, Clone, Serialize)]
pub struct CommittedOntology {
    pub version: i32,
    pub asset_types: Vec<AssetType>,
    pub root: ResolvedNode,
    pub report: BuildReport,
    pub committed_at: DateTime<Utc>,
}

/// Where a vendor datapoint lives on the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatapointBinding {
    pub provider_id: String,
    pub asset_gai: String,
    /// One platform asset per project the tree was created in.
    pub asset_ids: Vec<i64>,
    pub subtype: Subtype,
    pub prefix: String,
    pub attributes: Vec<String>,
}

/// A committed tree together with the registries derived from it.
#[derive(Debug)]
pub struct Snapshot {
    ontology: Arc<CommittedOntology>,
    datapoints: HashMap<String, Arc<DatapointBinding>>,
    /// (platform asset id, attribute) -> provider id, output datapoints only.
    outputs: HashMap<(i64, String), String>,
}

impl Snapshot {
    /// Index every datapoint of the tree. `asset_ids` maps node GAIs to
    /// platform asset ids across all projects.
    fn build(ontology: CommittedOntology, asset_ids: &HashMap<String, Vec<i64>>) -> Self {
        let mut datapoints = HashMap::new();
        let mut outputs = HashMap::new();

        ontology.root.walk(&mut |node| {
            let gai = node.gai();
            let ids = asset_ids.get(&gai).cloned().unwrap_or_default();
            for dp in &node.datapoints {
                let binding = DatapointBinding {
                    provider_id: dp.provider_id.clone(),
                    asset_gai: gai.clone(),
                    asset_ids: ids.clone(),
                    subtype: dp.subtype,
                    prefix: dp.attribute_name_prefix.clone(),
                    attributes: dp.attribute_names(),
                };
                if binding.subtype == Subtype::Output {
                    for asset_id in &binding.asset_ids {
                        for attribute in &binding.attributes {
                            outputs.insert((*asset_id, attribute.clone()), binding.provider_id.clone());
                        }
                    }
                }
                datapoints.insert(binding.provider_id.clone(), Arc::new(binding));
            }
        });

        Self {
            ontology: Arc::new(ontology),
            datapoints,
            outputs,
        }
    }

    pub fn ontology(&self) -> &Arc<CommittedOntology> {
        &self.ontology
    }

    pub fn datapoint(&self, provider_id: &str) -> Option<Arc<DatapointBinding>> {
        self.datapoints.get(provider_id).map(Arc::clone)
    }

    pub fn datapoint_count(&self) -> usize {
        self.datapoints.len()
    }

    /// Provider id of the output datapoint owning `attribute` on an asset.
    pub fn output_provider(&self, asset_id: i64, attribute: &str) -> Option<&str> {
        self.outputs
            .get(&(asset_id, attribute.to_owned()))
            .map(String::as_str)
    }
}

/// Runtime state of one account.
pub struct AccountState {
    snapshot: ArcSwapOption<Snapshot>,
    /// Vendor alarm session -> platform rule ids.
    alarm_rules: DashMap<String, Vec<i64>>,
    rule_sessions: DashMap<i64, String>,
    last_commit: watch::Sender<Option<DateTime<Utc>>>,
}

impl Default for AccountState {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountState {
    pub fn new() -> Self {
        let (last_commit, _) = watch::channel(None);
        Self {
            snapshot: ArcSwapOption::empty(),
            alarm_rules: DashMap::new(),
            rule_sessions: DashMap::new(),
            last_commit,
        }
    }

    // ── Commit ───────────────────────────────────────────────────────

    /// Replace the committed tree and its datapoint registries in one
    /// store. Alarm sessions survive commits.
    pub fn commit(&self, ontology: CommittedOntology, asset_ids: &HashMap<String, Vec<i64>>) {
        let committed_at = ontology.committed_at;
        self.snapshot
            .store(Some(Arc::new(Snapshot::build(ontology, asset_ids))));
        let _ = self.last_commit.send(Some(committed_at));
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    /// The registries of the last commit. Hold on to the returned
    /// snapshot when several lookups must agree with each other.
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.load_full()
    }

    pub fn committed(&self) -> Option<Arc<CommittedOntology>> {
        self.snapshot
            .load()
            .as_ref()
            .map(|snap| Arc::clone(&snap.ontology))
    }

    pub fn datapoint(&self, provider_id: &str) -> Option<Arc<DatapointBinding>> {
        self.snapshot
            .load()
            .as_ref()
            .and_then(|snap| snap.datapoint(provider_id))
    }

    pub fn datapoint_count(&self) -> usize {
        self.snapshot
            .load()
            .as_ref()
            .map_or(0, |snap| snap.datapoints.len())
    }

    pub fn output_provider(&self, asset_id: i64, attribute: &str) -> Option<String> {
        self.snapshot
            .load()
            .as_ref()
            .and_then(|snap| snap.output_provider(asset_id, attribute).map(str::to_owned))
    }

    pub fn last_commit(&self) -> Option<DateTime<Utc>> {
        *self.last_commit.borrow()
    }

    pub fn subscribe_commits(&self) -> watch::Receiver<Option<DateTime<Utc>>> {
        self.last_commit.subscribe()
    }

    // ── Alarm sessions ───────────────────────────────────────────────

    pub fn alarm_rules(&self, session_id: &str) -> Option<Vec<i64>> {
        self.alarm_rules.get(session_id).map(|r| r.value().clone())
    }

    pub fn remember_alarm_rules(&self, session_id: &str, rule_ids: Vec<i64>) {
        for rule_id in &rule_ids {
            self.rule_sessions.insert(*rule_id, session_id.to_owned());
        }
        self.alarm_rules.insert(session_id.to_owned(), rule_ids);
    }

    pub fn forget_alarm_session(&self, session_id: &str) {
        if let Some((_, rule_ids)) = self.alarm_rules.remove(session_id) {
            for rule_id in rule_ids {
                self.rule_sessions.remove(&rule_id);
            }
        }
    }

    /// Vendor session behind a platform rule.
    pub fn alarm_session(&self, rule_id: i64) -> Option<String> {
        self.rule_sessions.get(&rule_id).map(|r| r.value().clone())
    }
}
