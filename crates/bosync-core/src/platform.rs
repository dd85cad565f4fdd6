// ── External collaborators ──
//
// The engine talks to two sides: the vendor gateway (ontology source,
// live-data writes, subscriptions) and the asset-management platform the
// hierarchy is exported to. Both are traits so the synchronizer can run
// against the real API client, a dry-run recorder, or test fakes.

use std::collections::HashMap;
use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use bosync_api::models::{AlarmAckDto, LiveDataWriteDto};
use bosync_api::{ClientCredentials, OntologyClient, SubscriptionTopic, TransportConfig};

use crate::config::AccountConfig;
use crate::error::CoreError;
use crate::model::{AlarmMessage, AssetType, DataValue, FlatValues, Ontology, ResolvedNode, Subtype};

/// Client reference stamped on platform writes so echoes can be recognized.
pub const CLIENT_REFERENCE: &str = "bosync";

// ── Vendor side ──────────────────────────────────────────────────────

/// Where ontologies come from.
pub trait OntologySource: Send + Sync {
    fn ontology_version(&self) -> impl Future<Output = Result<i32, CoreError>> + Send;

    fn ontology(&self) -> impl Future<Output = Result<Ontology, CoreError>> + Send;
}

/// One value written back to a vendor datapoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveDataWrite {
    pub provider_id: String,
    pub value: DataValue,
}

/// An acknowledgement forwarded to the vendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorAlarmAck {
    pub session_id: String,
    pub acked_by: String,
    pub comment: String,
}

/// Writes going back to the vendor.
pub trait VendorWriter: Send + Sync {
    fn put_live_data(
        &self,
        writes: &[LiveDataWrite],
    ) -> impl Future<Output = Result<(), CoreError>> + Send;

    fn acknowledge_alarm(
        &self,
        ack: &VendorAlarmAck,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;
}

/// Webhook subscription management.
pub trait Subscriber: Send + Sync {
    fn subscribe(
        &self,
        topic: SubscriptionTopic,
        webhook_url: &Url,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;
}

/// Opens vendor clients for accounts.
pub trait VendorConnector: Send + Sync + 'static {
    type Client: OntologySource + VendorWriter + Subscriber + 'static;

    fn connect(&self, account: &AccountConfig) -> Result<Self::Client, CoreError>;
}

// ── Asset platform side ──────────────────────────────────────────────

/// Result of exporting a tree into one project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetCreation {
    /// Assets newly created (as opposed to updated).
    pub created: usize,
    /// GAI -> platform asset id, for every node in the tree.
    pub asset_ids: HashMap<String, i64>,
}

/// One data write to a platform asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataUpsert {
    pub asset_id: i64,
    pub subtype: Subtype,
    pub data: FlatValues,
    pub timestamp: DateTime<Utc>,
    pub client_reference: String,
}

/// An alarm rule on one attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmRuleSpec {
    pub asset_id: i64,
    pub subtype: Subtype,
    pub attribute: String,
    pub requires_acknowledge: bool,
    pub priority: u8,
    pub message: AlarmMessage,
}

/// State change of a platform alarm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmStatusUpdate {
    pub rule_id: i64,
    pub occurred_at: DateTime<Utc>,
    /// Acknowledgement text, when acknowledged.
    pub acknowledged: Option<String>,
    pub closed: bool,
}

/// An output attribute changed on the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputChange {
    pub asset_id: i64,
    pub data: FlatValues,
    pub client_reference: Option<String>,
}

/// An alarm acknowledged by a platform user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformAlarmAck {
    pub rule_id: i64,
    pub user: String,
    pub text: String,
}

/// The asset-management platform the hierarchy is exported to.
pub trait AssetPlatform: Send + Sync + 'static {
    fn upsert_asset_type(
        &self,
        asset_type: &AssetType,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;

    fn create_assets(
        &self,
        project_id: &str,
        root: &ResolvedNode,
    ) -> impl Future<Output = Result<AssetCreation, CoreError>> + Send;

    fn upsert_data(&self, upsert: &DataUpsert) -> impl Future<Output = Result<(), CoreError>> + Send;

    fn create_alarm_rule(
        &self,
        rule: &AlarmRuleSpec,
    ) -> impl Future<Output = Result<i64, CoreError>> + Send;

    fn update_alarm_status(
        &self,
        update: &AlarmStatusUpdate,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Current flat data of one asset and subtype.
    fn asset_data(
        &self,
        asset_id: i64,
        subtype: Subtype,
    ) -> impl Future<Output = Result<FlatValues, CoreError>> + Send;

    fn notify_assets_created(
        &self,
        project_id: &str,
        count: usize,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;
}

// ── Gateway API implementation ───────────────────────────────────────

impl OntologySource for OntologyClient {
    async fn ontology_version(&self) -> Result<i32, CoreError> {
        Ok(self.get_ontology_version().await?)
    }

    async fn ontology(&self) -> Result<Ontology, CoreError> {
        Ok(self.get_ontology().await?.into())
    }
}

impl VendorWriter for OntologyClient {
    async fn put_live_data(&self, writes: &[LiveDataWrite]) -> Result<(), CoreError> {
        let dtos: Vec<LiveDataWriteDto> = writes
            .iter()
            .map(|w| LiveDataWriteDto {
                id: w.provider_id.clone(),
                value: w.value.clone().into(),
            })
            .collect();
        Ok(OntologyClient::put_live_data(self, &dtos).await?)
    }

    async fn acknowledge_alarm(&self, ack: &VendorAlarmAck) -> Result<(), CoreError> {
        let dto = AlarmAckDto {
            session_id: ack.session_id.clone(),
            acked_by: ack.acked_by.clone(),
            acked_by_id: String::new(),
            comment: ack.comment.clone(),
        };
        Ok(OntologyClient::acknowledge_alarm(self, &dto).await?)
    }
}

impl Subscriber for OntologyClient {
    async fn subscribe(&self, topic: SubscriptionTopic, webhook_url: &Url) -> Result<(), CoreError> {
        OntologyClient::subscribe(self, topic, webhook_url).await?;
        Ok(())
    }
}

/// Connects accounts through the gateway HTTP API.
#[derive(Debug, Clone, Default)]
pub struct ApiConnector;

impl VendorConnector for ApiConnector {
    type Client = OntologyClient;

    fn connect(&self, account: &AccountConfig) -> Result<OntologyClient, CoreError> {
        let mut credentials = ClientCredentials::new(
            account.client_id.clone(),
            account.client_secret.clone(),
            account.token_url.clone(),
        );
        credentials.scope.clone_from(&account.token_scope);

        let transport = TransportConfig::with_timeout(account.request_timeout);
        Ok(OntologyClient::new(
            account.api_base_url.clone(),
            account.gateway_id.clone(),
            credentials,
            &transport,
        )?)
    }
}
