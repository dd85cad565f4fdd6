#![allow(clippy::unwrap_used)]
// Synchronizer tests against an in-memory gateway and platform.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use url::Url;

use bosync_api::SubscriptionTopic;
use bosync_api::models::OntologyDto;
use bosync_core::model::{DataValue, FlatValues, Ontology, ResolvedNode, Subtype};
use bosync_core::{
    AccountConfig, AccountId, AlarmRuleSpec, AlarmStatusUpdate, AssetCreation, AssetPlatform,
    AssetType, ConfigStore, CoreError, DataUpsert, LiveDataWrite, LiveUpdate, MemoryConfigStore,
    OntologySource, OutputChange, PlatformAlarmAck, Subscriber, SyncOutcome, Synchronizer,
    VendorAlarmAck, VendorConnector, VendorWriter, WebhookDispatcher, WebhookOutcome,
};

const ACCOUNT: AccountId = AccountId(1);
const PROJECT: &str = "p-1";

// ── Fake gateway ─────────────────────────────────────────────────────

#[derive(Default)]
struct GatewayState {
    version: AtomicI32,
    ontology: Mutex<Ontology>,
    fetches: AtomicUsize,
    writes: Mutex<Vec<LiveDataWrite>>,
    acks: Mutex<Vec<VendorAlarmAck>>,
    subscriptions: Mutex<Vec<(SubscriptionTopic, Url)>>,
}

#[derive(Clone, Default)]
struct Gateway(Arc<GatewayState>);

impl Gateway {
    fn serve(&self, version: i32, document: &Value) {
        let dto: OntologyDto = serde_json::from_value(document.clone()).unwrap();
        self.0.version.store(version, Ordering::SeqCst);
        *self.0.ontology.lock().unwrap() = dto.into();
    }

    fn fetches(&self) -> usize {
        self.0.fetches.load(Ordering::SeqCst)
    }
}

impl OntologySource for Gateway {
    async fn ontology_version(&self) -> Result<i32, CoreError> {
        Ok(self.0.version.load(Ordering::SeqCst))
    }

    async fn ontology(&self) -> Result<Ontology, CoreError> {
        self.0.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.0.ontology.lock().unwrap().clone())
    }
}

impl VendorWriter for Gateway {
    async fn put_live_data(&self, writes: &[LiveDataWrite]) -> Result<(), CoreError> {
        self.0.writes.lock().unwrap().extend_from_slice(writes);
        Ok(())
    }

    async fn acknowledge_alarm(&self, ack: &VendorAlarmAck) -> Result<(), CoreError> {
        self.0.acks.lock().unwrap().push(ack.clone());
        Ok(())
    }
}

impl Subscriber for Gateway {
    async fn subscribe(&self, topic: SubscriptionTopic, webhook_url: &Url) -> Result<(), CoreError> {
        self.0
            .subscriptions
            .lock()
            .unwrap()
            .push((topic, webhook_url.clone()));
        Ok(())
    }
}

impl VendorConnector for Gateway {
    type Client = Gateway;

    fn connect(&self, _account: &AccountConfig) -> Result<Gateway, CoreError> {
        Ok(self.clone())
    }
}

// ── Recording platform ───────────────────────────────────────────────

#[derive(Default)]
struct Platform {
    asset_types: Mutex<Vec<AssetType>>,
    assets: Mutex<HashMap<String, i64>>,
    next_id: AtomicI64,
    notified: Mutex<Vec<(String, usize)>>,
    upserts: Mutex<Vec<DataUpsert>>,
    rules: Mutex<Vec<AlarmRuleSpec>>,
    statuses: Mutex<Vec<AlarmStatusUpdate>>,
    data: Mutex<HashMap<(i64, Subtype), FlatValues>>,
}

impl Platform {
    fn asset_id(&self, gai: &str) -> i64 {
        self.assets.lock().unwrap()[gai]
    }
}

impl AssetPlatform for Platform {
    async fn upsert_asset_type(&self, asset_type: &AssetType) -> Result<(), CoreError> {
        self.asset_types.lock().unwrap().push(asset_type.clone());
        Ok(())
    }

    async fn create_assets(&self, _project_id: &str, root: &ResolvedNode) -> Result<AssetCreation, CoreError> {
        let mut assets = self.assets.lock().unwrap();
        let mut creation = AssetCreation::default();
        root.walk(&mut |node| {
            let gai = node.gai();
            let id = *assets.entry(gai.clone()).or_insert_with(|| {
                creation.created += 1;
                100 + self.next_id.fetch_add(1, Ordering::SeqCst)
            });
            creation.asset_ids.insert(gai, id);
        });
        Ok(creation)
    }

    async fn upsert_data(&self, upsert: &DataUpsert) -> Result<(), CoreError> {
        self.upserts.lock().unwrap().push(upsert.clone());
        Ok(())
    }

    async fn create_alarm_rule(&self, rule: &AlarmRuleSpec) -> Result<i64, CoreError> {
        let mut rules = self.rules.lock().unwrap();
        rules.push(rule.clone());
        Ok(500 + i64::try_from(rules.len()).unwrap())
    }

    async fn update_alarm_status(&self, update: &AlarmStatusUpdate) -> Result<(), CoreError> {
        self.statuses.lock().unwrap().push(update.clone());
        Ok(())
    }

    async fn asset_data(&self, asset_id: i64, subtype: Subtype) -> Result<FlatValues, CoreError> {
        Ok(self
            .data
            .lock()
            .unwrap()
            .get(&(asset_id, subtype))
            .cloned()
            .unwrap_or_default())
    }

    async fn notify_assets_created(&self, project_id: &str, count: usize) -> Result<(), CoreError> {
        self.notified.lock().unwrap().push((project_id.to_owned(), count));
        Ok(())
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────

fn single_sensor() -> Value {
    json!({
        "settings": { "version": 1 },
        "assetTemplates": [{ "id": "asset-template-1", "name": "Temperature Sensor" }],
        "units": [{ "id": "u-celsius", "symbol": "°C" }],
        "dataTypes": [{ "id": "t-temp", "format": "float", "name": "Temperature", "unitId": "u-celsius" }],
        "datapointTemplates": [{
            "id": "dpt-temp", "name": "Temperature", "assetTemplateId": "asset-template-1",
            "typeId": "t-temp", "direction": "feedback"
        }],
        "assets": [{ "id": "sensor-1", "name": "Sensor 1", "templateId": "asset-template-1" }],
        "datapoints": [{ "id": "dp-temp-1", "templateId": "dpt-temp", "assetId": "sensor-1" }]
    })
}

fn nested_spaces() -> Value {
    let mut doc = single_sensor();
    doc["spaces"] = json!([
        { "id": "Building 1", "name": "Building 1", "parentId": "", "templateId": "st-building" },
        {
            "id": "Floor 1", "name": "Floor 1", "parentId": "Building 1", "templateId": "st-floor",
            "assets": [{ "id": "sensor-1", "master": true }]
        }
    ]);
    doc
}

/// Single sensor plus a writable three-field setpoint.
fn with_setpoint() -> Value {
    let mut doc = single_sensor();
    doc["dataTypes"] = json!([
        { "id": "t-temp", "format": "float", "name": "Temperature", "unitId": "u-celsius" },
        { "id": "t-int", "format": "int", "name": "Integer" },
        {
            "id": "t-setpoint", "format": "complex", "name": "Setpoint",
            "fields": [
                { "name": "low", "typeId": "t-temp" },
                { "name": "high", "typeId": "t-temp" },
                { "name": "mode", "typeId": "t-int" }
            ]
        }
    ]);
    doc["datapointTemplates"] = json!([
        {
            "id": "dpt-temp", "name": "Temperature", "assetTemplateId": "asset-template-1",
            "typeId": "t-temp", "direction": "feedback"
        },
        {
            "id": "dpt-set", "name": "Setpoint", "assetTemplateId": "asset-template-1",
            "typeId": "t-setpoint", "direction": "command"
        }
    ]);
    doc["datapoints"] = json!([
        { "id": "dp-temp-1", "templateId": "dpt-temp", "assetId": "sensor-1" },
        { "id": "dp-set-1", "templateId": "dpt-set", "assetId": "sensor-1" }
    ]);
    doc
}

fn account() -> AccountConfig {
    let mut account = AccountConfig::new(
        ACCOUNT,
        "gw-1",
        "client",
        "secret".to_string().into(),
        Url::parse("https://gateway.example/apiproxy/v1").unwrap(),
        Url::parse("https://login.example/oauth2/token").unwrap(),
    );
    account.project_ids = vec![PROJECT.to_owned()];
    account
}

fn setup(document: &Value) -> (Gateway, Synchronizer<Gateway, Platform, MemoryConfigStore>) {
    let gateway = Gateway::default();
    gateway.serve(1, document);
    let store = MemoryConfigStore::new();
    store.upsert(account());
    let sync = Synchronizer::new(gateway.clone(), Platform::default(), store);
    (gateway, sync)
}

fn synced(outcome: SyncOutcome) -> bosync_core::SyncSummary {
    match outcome {
        SyncOutcome::Synced(summary) => summary,
        other => panic!("expected a rebuild, got {other:?}"),
    }
}

// ── Rebuild ──────────────────────────────────────────────────────────

#[tokio::test]
async fn unassociated_asset_becomes_functional_child() {
    let (_, sync) = setup(&single_sensor());
    let summary = synced(sync.sync_account(ACCOUNT).await.unwrap());

    assert_eq!(summary.asset_types, 2);
    let committed = sync.account_state(ACCOUNT).committed().unwrap();
    let names: Vec<_> = committed
        .root
        .functional_children
        .iter()
        .map(|n| n.name.as_str())
        .collect();
    assert_eq!(names, ["Sensor 1"]);
    assert!(committed.root.locational_children.is_empty());

    let types = sync.platform().asset_types.lock().unwrap();
    let names: Vec<_> = types.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["bos_asset-template-1", "bos_root"]);
    let temperature = types[0].attribute("Temperature").unwrap();
    assert_eq!(temperature.unit.as_deref(), Some("°C"));
    assert_eq!(temperature.subtype, Subtype::Input);
}

#[tokio::test]
async fn nested_spaces_form_a_chain() {
    let (_, sync) = setup(&nested_spaces());
    synced(sync.sync_account(ACCOUNT).await.unwrap());

    let committed = sync.account_state(ACCOUNT).committed().unwrap();
    let root = &committed.root;
    assert_eq!(root.locational_children.len(), 1);
    let building = &root.locational_children["Building 1"];
    assert_eq!(building.locational_children.len(), 1);
    let floor = &building.locational_children["Floor 1"];
    assert_eq!(floor.locational_children.len(), 1);
    assert_eq!(floor.locational_children["sensor-1"].name, "Sensor 1");
    assert!(root.functional_children.is_empty());
    assert!(root.find_by_names(&["Building 1", "Floor 1", "Sensor 1"]).is_some());
}

#[tokio::test]
async fn complex_type_expands_to_one_attribute_per_field() {
    let (_, sync) = setup(&with_setpoint());
    synced(sync.sync_account(ACCOUNT).await.unwrap());

    let types = sync.platform().asset_types.lock().unwrap();
    let mut setpoint: Vec<_> = types[0]
        .attributes
        .iter()
        .filter(|a| a.name.starts_with("Setpoint."))
        .map(|a| (a.name.as_str(), a.subtype))
        .collect();
    setpoint.sort_unstable_by_key(|(name, _)| *name);
    assert_eq!(
        setpoint,
        [
            ("Setpoint.high", Subtype::Output),
            ("Setpoint.low", Subtype::Output),
            ("Setpoint.mode", Subtype::Output),
        ]
    );
}

#[tokio::test]
async fn unchanged_version_fetches_once() {
    let (gateway, sync) = setup(&single_sensor());

    synced(sync.sync_account(ACCOUNT).await.unwrap());
    let second = sync.sync_account(ACCOUNT).await.unwrap();

    assert_eq!(second, SyncOutcome::UpToDate { version: 1 });
    assert_eq!(gateway.fetches(), 1);
    assert_eq!(sync.config_store().ontology_version(ACCOUNT).unwrap(), Some(1));
}

#[tokio::test]
async fn version_bump_rebuilds_and_notifies_only_new_assets() {
    let (gateway, sync) = setup(&single_sensor());
    let first = synced(sync.sync_account(ACCOUNT).await.unwrap());
    assert_eq!(first.assets_created, 2);
    let sensor_id = sync.platform().asset_id("bos_sensor-1");

    gateway.serve(2, &nested_spaces());
    let second = synced(sync.sync_account(ACCOUNT).await.unwrap());
    assert_eq!(second.version, 2);
    // Root and sensor already exist; only the two spaces are new.
    assert_eq!(second.assets_created, 2);
    assert_eq!(sync.platform().assets.lock().unwrap().len(), 4);
    assert_eq!(sync.platform().asset_id("bos_sensor-1"), sensor_id);
    assert!(sync.platform().assets.lock().unwrap().contains_key("bos_Floor 1"));

    let notified = sync.platform().notified.lock().unwrap().clone();
    assert_eq!(notified, [(PROJECT.to_owned(), 2), (PROJECT.to_owned(), 2)]);
    assert_eq!(gateway.fetches(), 2);
}

#[tokio::test]
async fn disabled_account_is_skipped_and_deactivated() {
    let (gateway, sync) = setup(&single_sensor());
    sync.sync_account(ACCOUNT).await.unwrap();
    assert!(sync.config_store().is_active(ACCOUNT).unwrap());

    let mut disabled = account();
    disabled.enable = false;
    sync.config_store().upsert(disabled);
    gateway.serve(2, &single_sensor());

    let outcome = sync.sync_account(ACCOUNT).await.unwrap();
    assert_eq!(outcome, SyncOutcome::Disabled);
    assert!(!sync.config_store().is_active(ACCOUNT).unwrap());
    assert_eq!(gateway.fetches(), 1);
}

#[tokio::test]
async fn run_cycle_subscribes_every_topic() {
    let gateway = Gateway::default();
    gateway.serve(1, &single_sensor());
    let store = MemoryConfigStore::new();
    let mut with_webhook = account();
    with_webhook.webhook_base_url = Some(Url::parse("https://hooks.example/bosync/").unwrap());
    store.upsert(with_webhook);
    let sync = Synchronizer::new(gateway.clone(), Platform::default(), store);

    sync.run_cycle(ACCOUNT).await.unwrap();

    let urls: Vec<String> = gateway
        .0
        .subscriptions
        .lock()
        .unwrap()
        .iter()
        .map(|(_, url)| url.to_string())
        .collect();
    assert_eq!(
        urls,
        [
            "https://hooks.example/bosync/1/ontology-version",
            "https://hooks.example/bosync/1/ontology-livedata",
            "https://hooks.example/bosync/1/ontology-livealarm",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn scheduler_runs_due_accounts_until_cancelled() {
    let (gateway, sync) = setup(&single_sensor());
    let cancel = CancellationToken::new();

    let scheduler = {
        let sync = sync.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { sync.run(cancel).await })
    };
    tokio::time::sleep(Duration::from_secs(1)).await;
    cancel.cancel();
    scheduler.await.unwrap();

    assert_eq!(gateway.fetches(), 1);
    assert_eq!(sync.config_store().ontology_version(ACCOUNT).unwrap(), Some(1));
}

// ── Live routing ─────────────────────────────────────────────────────

#[tokio::test]
async fn live_values_are_flattened_onto_assets() {
    let (_, sync) = setup(&with_setpoint());
    synced(sync.sync_account(ACCOUNT).await.unwrap());
    let dispatcher = WebhookDispatcher::new(sync.clone());

    let body = json!({
        "Items": [
            {
                "Id": "dp-set-1", "Timestamp": "2024-02-03T10:00:00Z", "Quality": "good",
                "Value": { "low": 18, "high": 24, "mode": 1 }
            },
            { "Id": "dp-temp-1", "Timestamp": "2024-02-03T10:00:00Z", "Quality": "bad", "Value": 21 },
            { "Id": "dp-unknown", "Timestamp": "2024-02-03T10:00:00Z", "Quality": "good", "Value": 1 }
        ],
        "Id": "sub-1",
        "NotificationIdentifier": "LiveData"
    });
    let outcome = dispatcher
        .dispatch("/1/ontology-livedata", body.to_string().as_bytes())
        .await
        .unwrap();

    let WebhookOutcome::LiveData { report } = outcome else {
        panic!("unexpected outcome {outcome:?}");
    };
    assert_eq!((report.applied, report.dropped), (1, 2));

    let sensor = sync.platform().asset_id("bos_sensor-1");
    let upserts = sync.platform().upserts.lock().unwrap();
    assert_eq!(upserts.len(), 1);
    assert_eq!(upserts[0].asset_id, sensor);
    assert_eq!(upserts[0].subtype, Subtype::Output);
    assert_eq!(
        upserts[0].data,
        FlatValues::from([
            ("Setpoint.high".to_owned(), DataValue::from(24_i64)),
            ("Setpoint.low".to_owned(), DataValue::from(18_i64)),
            ("Setpoint.mode".to_owned(), DataValue::from(1_i64)),
        ])
    );
}

#[tokio::test]
async fn scalar_for_complex_datapoint_is_dropped() {
    let (_, sync) = setup(&with_setpoint());
    synced(sync.sync_account(ACCOUNT).await.unwrap());

    let report = sync
        .apply_live_data(
            ACCOUNT,
            &[LiveUpdate {
                provider_id: "dp-set-1".into(),
                value: DataValue::from(20_i64),
                timestamp: chrono::Utc::now(),
            }],
        )
        .await
        .unwrap();
    assert_eq!((report.applied, report.dropped), (0, 1));
    assert!(sync.platform().upserts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn output_change_is_rebuilt_and_written_back() {
    let (gateway, sync) = setup(&with_setpoint());
    synced(sync.sync_account(ACCOUNT).await.unwrap());
    let sensor = sync.platform().asset_id("bos_sensor-1");

    sync.platform().data.lock().unwrap().insert(
        (sensor, Subtype::Output),
        FlatValues::from([
            ("Setpoint.low".to_owned(), DataValue::from(18_i64)),
            ("Setpoint.high".to_owned(), DataValue::from(24_i64)),
            ("Setpoint.mode".to_owned(), DataValue::from(1_i64)),
        ]),
    );

    let written = sync
        .apply_output_change(
            ACCOUNT,
            &OutputChange {
                asset_id: sensor,
                data: FlatValues::from([("Setpoint.high".to_owned(), DataValue::from(26_i64))]),
                client_reference: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(written, 1);

    let writes = gateway.0.writes.lock().unwrap().clone();
    assert_eq!(
        writes,
        [LiveDataWrite {
            provider_id: "dp-set-1".into(),
            value: json!({ "low": 18, "high": 26, "mode": 1 }).into(),
        }]
    );
}

#[tokio::test]
async fn own_output_echo_is_ignored() {
    let (gateway, sync) = setup(&with_setpoint());
    synced(sync.sync_account(ACCOUNT).await.unwrap());
    let sensor = sync.platform().asset_id("bos_sensor-1");

    let written = sync
        .apply_output_change(
            ACCOUNT,
            &OutputChange {
                asset_id: sensor,
                data: FlatValues::from([("Setpoint.high".to_owned(), DataValue::from(26_i64))]),
                client_reference: Some(bosync_core::CLIENT_REFERENCE.to_owned()),
            },
        )
        .await
        .unwrap();
    assert_eq!(written, 0);
    assert!(gateway.0.writes.lock().unwrap().is_empty());
}

#[tokio::test]
async fn alarm_session_creates_rules_once_and_forwards_acks() {
    let (gateway, sync) = setup(&single_sensor());
    synced(sync.sync_account(ACCOUNT).await.unwrap());
    let dispatcher = WebhookDispatcher::new(sync.clone());

    let alarm = |acked: bool, comment: &str| {
        json!([{
            "dataPointInstanceId": "dp-temp-1",
            "sessionId": "s-1",
            "name": "Overheat",
            "description": "too warm",
            "active": true,
            "acked": acked,
            "closed": false,
            "timeStamp": "03/02/2024 14:05:09",
            "quality": "Good",
            "ackedBy": "alice",
            "comment": comment,
            "needAcknowledge": true,
            "severity": "High"
        }])
        .to_string()
    };

    dispatcher
        .dispatch("/1/ontology-livealarm", alarm(false, "").as_bytes())
        .await
        .unwrap();
    dispatcher
        .dispatch("/1/ontology-livealarm", alarm(true, "checked").as_bytes())
        .await
        .unwrap();

    let rules = sync.platform().rules.lock().unwrap().clone();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].attribute, "Temperature");
    assert_eq!(rules[0].priority, 2);
    assert!(rules[0].requires_acknowledge);

    let statuses = sync.platform().statuses.lock().unwrap().clone();
    assert_eq!(statuses.len(), 2);
    assert_eq!(statuses[0].acknowledged, None);
    assert_eq!(statuses[1].acknowledged.as_deref(), Some("alice: checked"));

    sync.apply_platform_ack(
        ACCOUNT,
        &PlatformAlarmAck {
            rule_id: 501,
            user: "bob".into(),
            text: "on it".into(),
        },
    )
    .await
    .unwrap();
    let acks = gateway.0.acks.lock().unwrap().clone();
    assert_eq!(
        acks,
        [VendorAlarmAck {
            session_id: "s-1".into(),
            acked_by: "bob".into(),
            comment: "on it".into(),
        }]
    );
}

// ── Webhook routing ──────────────────────────────────────────────────

#[tokio::test]
async fn structure_version_notification_rebuilds() {
    let (gateway, sync) = setup(&single_sensor());
    let dispatcher = WebhookDispatcher::new(sync.clone());

    let body = json!({ "Version": 1, "NotificationIdentifier": "StructureVersion" });
    let outcome = dispatcher
        .dispatch("/1/ontology-version", body.to_string().as_bytes())
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        WebhookOutcome::Rebuild { outcome: SyncOutcome::Synced(_) }
    ));

    let other = json!({ "Version": 1, "NotificationIdentifier": "Other" });
    let outcome = dispatcher
        .dispatch("/1/ontology-version", other.to_string().as_bytes())
        .await
        .unwrap();
    assert_eq!(
        outcome,
        WebhookOutcome::Ignored {
            identifier: "Other".into()
        }
    );
    assert_eq!(gateway.fetches(), 1);
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let (_, sync) = setup(&single_sensor());
    let dispatcher = WebhookDispatcher::new(sync);

    let err = dispatcher
        .dispatch("/1/ontology-livealarm", b"{not json")
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidPayload { .. }));
}
