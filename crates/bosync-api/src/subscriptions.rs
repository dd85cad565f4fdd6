// Webhook subscriptions.
//
// The gateway pushes ontology version bumps, live data, and alarms to a
// webhook URL of the form `{base}/{account_id}/{topic}`. Each topic has
// its own subscribe endpoint; live data additionally needs a refresh call
// so the gateway sends the current values once.

use std::fmt;

use tracing::{debug, info};
use url::Url;

use crate::client::OntologyClient;
use crate::error::Error;
use crate::models::{SubscriptionDelete, SubscriptionRefresh, SubscriptionRequest, SubscriptionResult};

const SECOND_MS: u32 = 1_000;
const MINUTE_MS: u32 = 60 * SECOND_MS;

/// The three webhook topics the gateway can push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionTopic {
    OntologyVersion,
    LiveData,
    LiveAlarm,
}

impl SubscriptionTopic {
    pub const ALL: [Self; 3] = [Self::OntologyVersion, Self::LiveData, Self::LiveAlarm];

    /// Path segment used in the webhook URL.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OntologyVersion => "ontology-version",
            Self::LiveData => "ontology-livedata",
            Self::LiveAlarm => "ontology-livealarm",
        }
    }

    /// Parse a webhook path segment.
    pub fn from_segment(segment: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == segment)
    }

    /// Gateway endpoint managing subscriptions for this topic.
    pub fn endpoint(self) -> &'static str {
        match self {
            Self::OntologyVersion => "core/application/data/version/subscribe",
            Self::LiveData => "core/application/livedata/subscribe",
            Self::LiveAlarm => "core/application/livealarm/subscribe",
        }
    }

    /// Subscription parameters for this topic.
    ///
    /// Minimum send time 5 min, 3 retries 5 s apart, persisted across gateway
    /// restarts. Live data and alarms also carry a 5 min lease and ask for JSON.
    pub fn request(self, webhook_url: &Url) -> SubscriptionRequest {
        let leased = !matches!(self, Self::OntologyVersion);
        SubscriptionRequest {
            min_send_time: 5 * MINUTE_MS,
            max_send_time: 0,
            timestamp: None,
            webhook_url: webhook_url.to_string(),
            webhook_retries: 3,
            webhook_retry_delay: 5 * SECOND_MS,
            webhook_lease_time: leased.then_some(5 * MINUTE_MS),
            webhook_persist: Some(true),
            content_type: leased.then(|| "application/json".to_owned()),
            desired_units: Vec::new(),
        }
    }
}

impl fmt::Display for SubscriptionTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build `{base}/{account_id}/{topic}`.
pub fn webhook_url(base: &Url, account_id: i64, topic: SubscriptionTopic) -> Result<Url, Error> {
    let base = base.as_str().trim_end_matches('/');
    Ok(Url::parse(&format!("{base}/{account_id}/{}", topic.as_str()))?)
}

impl OntologyClient {
    /// Subscribe `webhook_url` to `topic`.
    ///
    /// For live data the initial-sync refresh is triggered right after
    /// the subscription succeeds.
    pub async fn subscribe(
        &self,
        topic: SubscriptionTopic,
        webhook_url: &Url,
    ) -> Result<Option<SubscriptionResult>, Error> {
        let request = topic.request(webhook_url);
        let result: Option<SubscriptionResult> =
            self.post_optional(topic.endpoint(), &request).await?;

        if topic == SubscriptionTopic::LiveData {
            let refresh = SubscriptionRefresh {
                webhook_url: &request.webhook_url,
            };
            self.put_no_response("core/application/livedata/subscribe/refresh", &refresh)
                .await?;
            debug!(%webhook_url, "triggered initial live data sync");
        }

        info!(%topic, %webhook_url, "subscribed");
        Ok(result)
    }

    /// Remove a subscription for `topic`.
    pub async fn delete_subscription(
        &self,
        topic: SubscriptionTopic,
        target: &SubscriptionDelete,
    ) -> Result<(), Error> {
        self.delete_with_body(topic.endpoint(), target).await
    }
}
