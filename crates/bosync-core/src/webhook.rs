// ── Webhook dispatch ──
//
// The gateway calls `{base}/{account_id}/{topic}` with one of three
// payloads. This module parses the path and body and routes them into the
// synchronizer. Serving HTTP is left to the embedding application.

use chrono::DateTime;
use serde::Serialize;
use tracing::{debug, info, warn};

use bosync_api::SubscriptionTopic;
use bosync_api::models::{LiveAlarmDto, LiveDataNotification, OntologyVersionNotification};

use crate::config::{AccountId, ConfigStore};
use crate::error::CoreError;
use crate::model::AlarmEvent;
use crate::platform::{AssetPlatform, VendorConnector};
use crate::sync::{ApplyReport, LiveUpdate, SyncOutcome, Synchronizer};

/// Notification identifier of an ontology structure change.
pub const STRUCTURE_VERSION: &str = "StructureVersion";

const GOOD_QUALITY: &str = "good";

/// Split `/{account_id}/{topic}` into its parts.
pub fn parse_webhook_path(path: &str) -> Result<(AccountId, SubscriptionTopic), CoreError> {
    let invalid = || CoreError::InvalidPayload {
        message: format!("webhook path {path:?} is not /{{account_id}}/{{topic}}"),
    };

    let trimmed = path.strip_prefix('/').ok_or_else(invalid)?;
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    let (account, topic) = trimmed.split_once('/').ok_or_else(invalid)?;

    let id = account.parse::<i64>().map_err(|_| invalid())?;
    let topic = SubscriptionTopic::from_segment(topic).ok_or_else(invalid)?;
    Ok((AccountId(id), topic))
}

/// What a webhook call did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WebhookOutcome {
    Rebuild { outcome: SyncOutcome },
    /// Version notification with an identifier other than a structure change.
    Ignored { identifier: String },
    LiveData { report: ApplyReport },
    Alarms { report: ApplyReport },
}

/// Routes webhook calls into a synchronizer.
pub struct WebhookDispatcher<V, P, S> {
    sync: Synchronizer<V, P, S>,
}

impl<V, P, S> WebhookDispatcher<V, P, S>
where
    V: VendorConnector,
    P: AssetPlatform,
    S: ConfigStore,
{
    pub fn new(sync: Synchronizer<V, P, S>) -> Self {
        Self { sync }
    }

    /// Handle one webhook call.
    ///
    /// Malformed paths and bodies fail with `InvalidPayload`. Individual
    /// items that cannot be applied are dropped and counted.
    pub async fn dispatch(&self, path: &str, body: &[u8]) -> Result<WebhookOutcome, CoreError> {
        let (id, topic) = parse_webhook_path(path)?;
        debug!(account = %id, %topic, bytes = body.len(), "webhook received");

        match topic {
            SubscriptionTopic::OntologyVersion => self.on_version(id, &decode(body)?).await,
            SubscriptionTopic::LiveData => self.on_live_data(id, decode(body)?).await,
            SubscriptionTopic::LiveAlarm => self.on_alarms(id, decode(body)?).await,
        }
    }

    async fn on_version(
        &self,
        id: AccountId,
        notification: &OntologyVersionNotification,
    ) -> Result<WebhookOutcome, CoreError> {
        if notification.notification_identifier != STRUCTURE_VERSION {
            warn!(
                account = %id,
                identifier = %notification.notification_identifier,
                "unknown version notification"
            );
            return Ok(WebhookOutcome::Ignored {
                identifier: notification.notification_identifier.clone(),
            });
        }

        info!(account = %id, version = notification.version, "structure version changed");
        let outcome = self.sync.sync_account(id).await?;
        Ok(WebhookOutcome::Rebuild { outcome })
    }

    async fn on_live_data(
        &self,
        id: AccountId,
        notification: LiveDataNotification,
    ) -> Result<WebhookOutcome, CoreError> {
        let mut report = ApplyReport::default();
        let mut updates = Vec::with_capacity(notification.items.len());

        for item in notification.items {
            let timestamp = match DateTime::parse_from_rfc3339(&item.timestamp) {
                Ok(ts) => ts.to_utc(),
                Err(e) => {
                    warn!(account = %id, provider_id = %item.id, timestamp = %item.timestamp, error = %e, "invalid live data timestamp");
                    report.dropped += 1;
                    continue;
                }
            };
            if item.quality != GOOD_QUALITY {
                debug!(account = %id, provider_id = %item.id, quality = %item.quality, "bad quality live data");
                report.dropped += 1;
                continue;
            }
            updates.push(LiveUpdate {
                provider_id: item.id,
                value: item.value.into(),
                timestamp,
            });
        }

        report.merge(self.sync.apply_live_data(id, &updates).await?);
        Ok(WebhookOutcome::LiveData { report })
    }

    async fn on_alarms(
        &self,
        id: AccountId,
        alarms: Vec<LiveAlarmDto>,
    ) -> Result<WebhookOutcome, CoreError> {
        let mut report = ApplyReport::default();

        for dto in alarms {
            if !dto.quality.eq_ignore_ascii_case(GOOD_QUALITY) {
                debug!(account = %id, session = %dto.session_id, quality = %dto.quality, "bad quality alarm");
                report.dropped += 1;
                continue;
            }
            let event = match AlarmEvent::try_from(dto) {
                Ok(event) => event,
                Err(e) => {
                    warn!(account = %id, error = %e, "dropping alarm");
                    report.dropped += 1;
                    continue;
                }
            };

            match self.sync.apply_alarm(id, &event).await {
                Ok(_) => report.applied += 1,
                Err(e) if e.is_transport() => return Err(e),
                Err(e) => {
                    warn!(account = %id, session = %event.session_id, error = %e, "dropping alarm");
                    report.dropped += 1;
                }
            }
        }
        Ok(WebhookOutcome::Alarms { report })
    }
}

fn decode<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, CoreError> {
    serde_json::from_slice(body).map_err(|e| CoreError::InvalidPayload {
        message: e.to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_account_and_topic() {
        let (id, topic) = parse_webhook_path("/42/ontology-livedata").unwrap();
        assert_eq!(id, AccountId(42));
        assert_eq!(topic, SubscriptionTopic::LiveData);

        let (_, topic) = parse_webhook_path("/7/ontology-version/").unwrap();
        assert_eq!(topic, SubscriptionTopic::OntologyVersion);
    }

    #[test]
    fn rejects_malformed_paths() {
        for path in [
            "42/ontology-version",
            "/abc/ontology-version",
            "/42/unknown",
            "/42",
            "/42/ontology-version/extra",
        ] {
            let err = parse_webhook_path(path).unwrap_err();
            assert!(matches!(err, CoreError::InvalidPayload { .. }), "{path}");
        }
    }
}
