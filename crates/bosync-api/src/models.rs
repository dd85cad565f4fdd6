// Wire types for the ontology gateway.
//
// Ontology document, subscription requests, live-data writes, alarms, and
// the webhook payloads the gateway pushes back. Field names follow the
// gateway's JSON exactly; `bosync-core` converts into its own model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Ontology document ────────────────────────────────────────────────

/// Full ontology export (`core/application/data`).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OntologyDto {
    #[serde(default)]
    pub settings: OntologySettingsDto,
    #[serde(default)]
    pub asset_templates: Vec<TemplateDto>,
    #[serde(default)]
    pub space_templates: Vec<TemplateDto>,
    #[serde(default)]
    pub units: Vec<UnitDto>,
    #[serde(default)]
    pub data_types: Vec<DataTypeDto>,
    #[serde(default)]
    pub datapoint_templates: Vec<DatapointTemplateDto>,
    #[serde(default)]
    pub property_templates: Vec<PropertyTemplateDto>,
    #[serde(default)]
    pub assets: Vec<AssetDto>,
    #[serde(default)]
    pub spaces: Vec<SpaceDto>,
    #[serde(default)]
    pub datapoints: Vec<DatapointDto>,
    #[serde(default)]
    pub properties: Vec<PropertyDto>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OntologySettingsDto {
    #[serde(default)]
    pub version: i32,
}

/// Asset or space template header.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDto {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UnitDto {
    pub id: String,
    #[serde(default)]
    pub symbol: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataTypeDto {
    pub id: String,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub unit_id: String,
    #[serde(default)]
    pub fields: Vec<DataTypeFieldDto>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    #[serde(default)]
    pub enums: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataTypeFieldDto {
    pub name: String,
    pub type_id: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatapointTemplateDto {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub asset_template_id: String,
    #[serde(default)]
    pub space_template_id: String,
    #[serde(default)]
    pub type_id: String,
    #[serde(default)]
    pub direction: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyTemplateDto {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub asset_template_id: String,
    #[serde(default)]
    pub space_template_id: String,
    #[serde(default)]
    pub type_id: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDto {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub template_id: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceDto {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub parent_id: String,
    #[serde(default)]
    pub template_id: String,
    #[serde(default)]
    pub assets: Vec<SpaceAssetDto>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SpaceAssetDto {
    pub id: String,
    #[serde(default)]
    pub master: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatapointDto {
    pub id: String,
    #[serde(default)]
    pub template_id: String,
    #[serde(default)]
    pub asset_id: String,
    #[serde(default)]
    pub space_id: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDto {
    pub id: String,
    #[serde(default)]
    pub template_id: String,
    #[serde(default)]
    pub asset_id: String,
    #[serde(default)]
    pub space_id: String,
    #[serde(default)]
    pub value: Option<Value>,
}

// ── Subscriptions ────────────────────────────────────────────────────

/// Subscription creation request. Times are milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRequest {
    pub min_send_time: u32,
    pub max_send_time: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(rename = "webhookURL")]
    pub webhook_url: String,
    pub webhook_retries: u32,
    pub webhook_retry_delay: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_lease_time: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_persist: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub desired_units: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SubscriptionResult {
    pub id: Option<String>,
    #[serde(rename = "webhookURL")]
    pub webhook_url: Option<String>,
}

/// Identifies a subscription to remove (by id or by webhook URL).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SubscriptionDelete {
    #[serde(rename = "webhookURL", skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SubscriptionRefresh<'a> {
    #[serde(rename = "webhookURL")]
    pub(crate) webhook_url: &'a str,
}

// ── Live data ────────────────────────────────────────────────────────

/// One value written to a datapoint instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LiveDataWriteDto {
    pub id: String,
    pub value: Value,
}

/// Per-item outcome of a live-data write. Empty `error_code` means success.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LiveDataWriteResult {
    pub id: String,
    #[serde(default)]
    pub error_code: String,
    #[serde(default)]
    pub inner_error: String,
}

// ── Alarms ───────────────────────────────────────────────────────────

/// A live alarm, as listed by `core/application/livealarm` and pushed on
/// the `ontology-livealarm` webhook.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LiveAlarmDto {
    pub data_point_instance_id: String,
    pub session_id: String,
    pub name: String,
    pub description: String,
    pub trigger: String,
    pub active: bool,
    pub acked: bool,
    pub closed: bool,
    /// `dd/MM/yyyy HH:mm:ss`, always UTC.
    pub time_stamp: String,
    pub quality: String,
    pub value: Option<Value>,
    pub acked_by: String,
    pub comment: String,
    pub need_acknowledge: bool,
    pub severity: String,
    pub asset_id: String,
    pub space_id: String,
    pub asset_name: String,
    pub space_name: String,
    pub datapoint_name: String,
    pub unit_symbol: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AlarmAckDto {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub session_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub acked_by: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub acked_by_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub comment: String,
}

// ── Webhook payloads ─────────────────────────────────────────────────

/// Body of an `ontology-version` webhook call.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct OntologyVersionNotification {
    #[serde(default)]
    pub version: i64,
    pub id: Option<String>,
    pub tags: Option<String>,
    #[serde(default)]
    pub notification_identifier: String,
}

/// Body of an `ontology-livedata` webhook call.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LiveDataNotification {
    #[serde(default)]
    pub items: Vec<LiveDataItem>,
    #[serde(default)]
    pub id: String,
    pub tags: Option<String>,
    #[serde(default)]
    pub notification_identifier: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LiveDataItem {
    pub id: String,
    /// RFC 3339.
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub quality: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub unit_symbol: String,
    #[serde(default)]
    pub is_property: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ontology_tolerates_missing_sections() {
        let dto: OntologyDto = serde_json::from_value(json!({
            "settings": { "version": 7 },
            "assets": [{ "id": "a1", "name": "Sensor", "templateId": "t1" }]
        }))
        .unwrap();

        assert_eq!(dto.settings.version, 7);
        assert_eq!(dto.assets.len(), 1);
        assert!(dto.spaces.is_empty());
        assert!(dto.data_types.is_empty());
    }

    #[test]
    fn subscription_request_omits_unset_fields() {
        let req = SubscriptionRequest {
            min_send_time: 300_000,
            max_send_time: 0,
            timestamp: None,
            webhook_url: "https://hook.example/1/ontology-version".into(),
            webhook_retries: 3,
            webhook_retry_delay: 5_000,
            webhook_lease_time: None,
            webhook_persist: Some(true),
            content_type: None,
            desired_units: Vec::new(),
        };
        let value = serde_json::to_value(&req).unwrap();

        assert_eq!(value["webhookURL"], "https://hook.example/1/ontology-version");
        assert_eq!(value["minSendTime"], 300_000);
        assert!(value.get("webhookLeaseTime").is_none());
        assert!(value.get("contentType").is_none());
        assert!(value.get("desiredUnits").is_none());
    }

    #[test]
    fn live_data_notification_uses_pascal_case() {
        let n: LiveDataNotification = serde_json::from_value(json!({
            "Items": [{
                "Id": "dp-1",
                "Timestamp": "2024-05-01T10:00:00Z",
                "Quality": "good",
                "Value": { "value": 21.5 },
                "IsProperty": false
            }],
            "Id": "sub-1",
            "NotificationIdentifier": "LiveData"
        }))
        .unwrap();

        assert_eq!(n.items.len(), 1);
        assert_eq!(n.items[0].id, "dp-1");
        assert_eq!(n.items[0].value["value"], 21.5);
    }
}
