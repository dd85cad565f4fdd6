// ── Live routing ──
//
// Moves runtime data across the committed tree: vendor live data and
// alarms onto platform assets, platform output changes and alarm
// acknowledgements back to the vendor. Everything routes through the
// datapoint registry of the last commit.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use futures_util::{Stream, StreamExt};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::codec;
use crate::config::{AccountId, ConfigStore};
use crate::error::{CoreError, LookupKind};
use crate::model::{AlarmEvent, DataValue};
use crate::platform::{
    AlarmRuleSpec, AlarmStatusUpdate, AssetPlatform, CLIENT_REFERENCE, DataUpsert, LiveDataWrite,
    OutputChange, PlatformAlarmAck, VendorAlarmAck, VendorConnector, VendorWriter,
};

use super::Synchronizer;

/// One inbound value for a vendor datapoint.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveUpdate {
    pub provider_id: String,
    pub value: DataValue,
    pub timestamp: DateTime<Utc>,
}

/// Counts of a batch application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub applied: usize,
    pub dropped: usize,
}

impl ApplyReport {
    pub fn merge(&mut self, other: Self) {
        self.applied += other.applied;
        self.dropped += other.dropped;
    }
}

impl<V, P, S> Synchronizer<V, P, S>
where
    V: VendorConnector,
    P: AssetPlatform,
    S: ConfigStore,
{
    // ── Vendor -> platform ───────────────────────────────────────────

    /// Write live values onto every platform asset bound to their
    /// datapoints.
    ///
    /// Unknown datapoints and undecodable values drop the item; platform
    /// failures abort the batch.
    pub async fn apply_live_data(
        &self,
        id: AccountId,
        updates: &[LiveUpdate],
    ) -> Result<ApplyReport, CoreError> {
        let state = self.account_state(id);
        let mut report = ApplyReport::default();

        for update in updates {
            let Some(binding) = state.datapoint(&update.provider_id) else {
                warn!(account = %id, provider_id = %update.provider_id, "live data for unknown datapoint");
                report.dropped += 1;
                continue;
            };

            let data = match codec::decode_value(&update.value, &binding.prefix, &binding.attributes) {
                Ok(data) => data,
                Err(e) => {
                    warn!(account = %id, provider_id = %update.provider_id, error = %e, "dropping live value");
                    report.dropped += 1;
                    continue;
                }
            };

            for asset_id in &binding.asset_ids {
                self.platform()
                    .upsert_data(&DataUpsert {
                        asset_id: *asset_id,
                        subtype: binding.subtype,
                        data: data.clone(),
                        timestamp: update.timestamp,
                        client_reference: CLIENT_REFERENCE.to_owned(),
                    })
                    .await?;
            }
            report.applied += 1;
        }

        debug!(account = %id, applied = report.applied, dropped = report.dropped, "live data applied");
        Ok(report)
    }

    /// Mirror a vendor alarm onto the platform.
    ///
    /// Rules are created once per vendor session, one per attribute of
    /// the alarmed datapoint on every bound asset. Returns the number of
    /// rules updated.
    pub async fn apply_alarm(&self, id: AccountId, event: &AlarmEvent) -> Result<usize, CoreError> {
        let state = self.account_state(id);
        let binding = state
            .datapoint(&event.datapoint_id)
            .ok_or_else(|| CoreError::lookup(LookupKind::Datapoint, event.datapoint_id.clone()))?;

        let rule_ids = if let Some(rule_ids) = state.alarm_rules(&event.session_id) {
            rule_ids
        } else {
            let message = event.message();
            let mut rule_ids = Vec::new();
            for asset_id in &binding.asset_ids {
                for attribute in &binding.attributes {
                    let rule_id = self
                        .platform()
                        .create_alarm_rule(&AlarmRuleSpec {
                            asset_id: *asset_id,
                            subtype: binding.subtype,
                            attribute: attribute.clone(),
                            requires_acknowledge: event.need_acknowledge,
                            priority: event.priority(),
                            message: message.clone(),
                        })
                        .await?;
                    rule_ids.push(rule_id);
                }
            }
            info!(account = %id, session = %event.session_id, rules = rule_ids.len(), "alarm rules created");
            state.remember_alarm_rules(&event.session_id, rule_ids.clone());
            rule_ids
        };

        let acknowledged = event.acked.then(|| event.ack_text());
        for rule_id in &rule_ids {
            self.platform()
                .update_alarm_status(&AlarmStatusUpdate {
                    rule_id: *rule_id,
                    occurred_at: event.timestamp,
                    acknowledged: acknowledged.clone(),
                    closed: event.closed,
                })
                .await?;
        }

        if event.closed {
            state.forget_alarm_session(&event.session_id);
        }
        Ok(rule_ids.len())
    }

    // ── Platform -> vendor ───────────────────────────────────────────

    /// Write a platform output change back to the vendor.
    ///
    /// Each touched datapoint is rebuilt from the asset's current data
    /// overlaid with the change. Changes we wrote ourselves are ignored.
    /// Returns the number of datapoints written.
    pub async fn apply_output_change(
        &self,
        id: AccountId,
        change: &OutputChange,
    ) -> Result<usize, CoreError> {
        if change.client_reference.as_deref() == Some(CLIENT_REFERENCE) {
            debug!(account = %id, asset_id = change.asset_id, "ignoring own output echo");
            return Ok(0);
        }

        let Some(snapshot) = self.account_state(id).snapshot() else {
            debug!(account = %id, asset_id = change.asset_id, "output change before first commit");
            return Ok(0);
        };
        let providers: BTreeSet<String> = change
            .data
            .keys()
            .filter_map(|attribute| snapshot.output_provider(change.asset_id, attribute))
            .map(str::to_owned)
            .collect();
        if providers.is_empty() {
            debug!(account = %id, asset_id = change.asset_id, "output change touches no datapoint");
            return Ok(0);
        }

        let mut writes = Vec::with_capacity(providers.len());
        for provider_id in providers {
            let binding = snapshot
                .datapoint(&provider_id)
                .ok_or_else(|| CoreError::lookup(LookupKind::Datapoint, provider_id.clone()))?;

            let mut flat = self
                .platform()
                .asset_data(change.asset_id, binding.subtype)
                .await?;
            flat.extend(change.data.iter().map(|(k, v)| (k.clone(), v.clone())));

            let value = codec::encode_datapoint(&binding.attributes, &binding.prefix, &flat)?;
            writes.push(LiveDataWrite { provider_id, value });
        }

        let account = self.config_store().account(id)?;
        let client = self.inner.connector.connect(&account)?;
        client.put_live_data(&writes).await?;
        info!(account = %id, asset_id = change.asset_id, datapoints = writes.len(), "output written");
        Ok(writes.len())
    }

    /// Forward a platform acknowledgement to the vendor session behind
    /// the rule.
    pub async fn apply_platform_ack(
        &self,
        id: AccountId,
        ack: &PlatformAlarmAck,
    ) -> Result<(), CoreError> {
        let session_id = self
            .account_state(id)
            .alarm_session(ack.rule_id)
            .ok_or_else(|| CoreError::lookup(LookupKind::AlarmRule, ack.rule_id.to_string()))?;

        let account = self.config_store().account(id)?;
        let client = self.inner.connector.connect(&account)?;
        client
            .acknowledge_alarm(&VendorAlarmAck {
                session_id,
                acked_by: ack.user.clone(),
                comment: ack.text.clone(),
            })
            .await?;
        info!(account = %id, rule_id = ack.rule_id, "alarm acknowledgement forwarded");
        Ok(())
    }

    // ── Listeners ────────────────────────────────────────────────────

    /// Apply output changes from `changes` until the stream ends or
    /// `cancel` fires. Failures are logged per change.
    pub async fn forward_output_changes(
        &self,
        id: AccountId,
        changes: impl Stream<Item = OutputChange> + Send,
        cancel: CancellationToken,
    ) {
        let mut changes = std::pin::pin!(changes);
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                change = changes.next() => {
                    let Some(change) = change else { break };
                    if let Err(e) = self.apply_output_change(id, &change).await {
                        warn!(account = %id, asset_id = change.asset_id, error = %e, "output change failed");
                    }
                }
            }
        }
    }

    /// Forward platform acknowledgements from `acks` until the stream ends
    /// or `cancel` fires.
    pub async fn forward_alarm_acks(
        &self,
        id: AccountId,
        acks: impl Stream<Item = PlatformAlarmAck> + Send,
        cancel: CancellationToken,
    ) {
        let mut acks = std::pin::pin!(acks);
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                ack = acks.next() => {
                    let Some(ack) = ack else { break };
                    if let Err(e) = self.apply_platform_ack(id, &ack).await {
                        warn!(account = %id, rule_id = ack.rule_id, error = %e, "alarm acknowledgement failed");
                    }
                }
            }
        }
    }
}
