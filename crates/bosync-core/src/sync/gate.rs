// ── Rebuild gates ──
//
// `VersionGate` decides whether an ontology must be fetched at all.
// `RunOnceGate` collapses overlapping rebuild triggers for one account
// into a single in-flight run.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use crate::config::AccountId;
use crate::error::CoreError;
use crate::model::Ontology;
use crate::platform::OntologySource;

/// Result of a version check.
#[derive(Debug, Clone)]
pub enum VersionCheck {
    /// Remote version equals the committed one. Nothing was fetched.
    NoUpdate { version: i32 },
    /// Remote version differs; the full ontology was fetched.
    Changed { version: i32, ontology: Ontology },
}

/// Check-then-fetch against the last committed version.
pub struct VersionGate;

impl VersionGate {
    /// Fetch the ontology only when the remote version differs from
    /// `committed`. `None` always fetches.
    pub async fn check(
        source: &impl OntologySource,
        committed: Option<i32>,
    ) -> Result<VersionCheck, CoreError> {
        let version = source.ontology_version().await?;
        if committed == Some(version) {
            debug!(version, "ontology version unchanged");
            return Ok(VersionCheck::NoUpdate { version });
        }

        debug!(version, ?committed, "ontology version changed, fetching");
        let ontology = source.ontology().await?;
        Ok(VersionCheck::Changed { version, ontology })
    }
}

// ── Run-once gate ────────────────────────────────────────────────────

/// Per-account single-flight guard.
#[derive(Debug, Clone, Default)]
pub struct RunOnceGate {
    running: Arc<DashMap<AccountId, ()>>,
}

impl RunOnceGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the account. `None` if a run is already in flight.
    pub fn try_acquire(&self, id: AccountId) -> Option<RunGuard> {
        match self.running.entry(id) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(());
                Some(RunGuard {
                    id,
                    running: Arc::clone(&self.running),
                })
            }
        }
    }

    pub fn is_running(&self, id: AccountId) -> bool {
        self.running.contains_key(&id)
    }
}

/// Releases the account when dropped.
#[derive(Debug)]
pub struct RunGuard {
    id: AccountId,
    running: Arc<DashMap<AccountId, ()>>,
}

impl RunGuard {
    pub fn account(&self) -> AccountId {
        self.id
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.running.remove(&self.id);
    }
}
