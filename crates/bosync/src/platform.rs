//! In-process asset platform used when no platform backend is attached.
//!
//! Assigns ids, keeps asset data in memory, and logs every call so a
//! `bosync sync` run shows exactly what an export would do.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use dashmap::DashMap;
use tracing::{debug, info};

use bosync_core::{
    AlarmRuleSpec, AlarmStatusUpdate, AssetCreation, AssetPlatform, AssetType, CoreError,
    DataUpsert, FlatValues, ResolvedNode, Subtype,
};

#[derive(Debug, Default)]
struct Recorded {
    asset_types: DashMap<String, AssetType>,
    /// (project, GAI) -> asset id
    assets: DashMap<(String, String), i64>,
    data: DashMap<(i64, Subtype), FlatValues>,
    next_asset_id: AtomicI64,
    next_rule_id: AtomicI64,
}

/// Recording `AssetPlatform`. Cheaply cloneable.
#[derive(Debug, Clone, Default)]
pub struct DryRunPlatform {
    inner: Arc<Recorded>,
}

impl DryRunPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn asset_type_count(&self) -> usize {
        self.inner.asset_types.len()
    }

    pub fn asset_count(&self) -> usize {
        self.inner.assets.len()
    }
}

impl AssetPlatform for DryRunPlatform {
    async fn upsert_asset_type(&self, asset_type: &AssetType) -> Result<(), CoreError> {
        debug!(
            name = %asset_type.name,
            attributes = asset_type.attributes.len(),
            "upsert asset type"
        );
        self.inner
            .asset_types
            .insert(asset_type.name.clone(), asset_type.clone());
        Ok(())
    }

    async fn create_assets(
        &self,
        project_id: &str,
        root: &ResolvedNode,
    ) -> Result<AssetCreation, CoreError> {
        let mut creation = AssetCreation::default();
        root.walk(&mut |node| {
            let gai = node.gai();
            let id = *self
                .inner
                .assets
                .entry((project_id.to_owned(), gai.clone()))
                .or_insert_with(|| {
                    creation.created += 1;
                    self.inner.next_asset_id.fetch_add(1, Ordering::Relaxed) + 1
                });
            creation.asset_ids.insert(gai, id);
        });
        info!(
            project = project_id,
            created = creation.created,
            total = creation.asset_ids.len(),
            "assets exported"
        );
        Ok(creation)
    }

    async fn upsert_data(&self, upsert: &DataUpsert) -> Result<(), CoreError> {
        debug!(
            asset_id = upsert.asset_id,
            subtype = %upsert.subtype,
            values = upsert.data.len(),
            "upsert data"
        );
        self.inner
            .data
            .entry((upsert.asset_id, upsert.subtype))
            .or_default()
            .extend(upsert.data.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }

    async fn create_alarm_rule(&self, rule: &AlarmRuleSpec) -> Result<i64, CoreError> {
        let id = self.inner.next_rule_id.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(
            rule_id = id,
            asset_id = rule.asset_id,
            attribute = %rule.attribute,
            priority = rule.priority,
            "create alarm rule"
        );
        Ok(id)
    }

    async fn update_alarm_status(&self, update: &AlarmStatusUpdate) -> Result<(), CoreError> {
        debug!(
            rule_id = update.rule_id,
            acknowledged = update.acknowledged.is_some(),
            closed = update.closed,
            "update alarm status"
        );
        Ok(())
    }

    async fn asset_data(&self, asset_id: i64, subtype: Subtype) -> Result<FlatValues, CoreError> {
        Ok(self
            .inner
            .data
            .get(&(asset_id, subtype))
            .map(|d| d.value().clone())
            .unwrap_or_default())
    }

    async fn notify_assets_created(&self, project_id: &str, count: usize) -> Result<(), CoreError> {
        info!(project = project_id, count, "assets created");
        Ok(())
    }
}
