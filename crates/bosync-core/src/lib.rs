// bosync-core: Ontology resolution, hierarchy synthesis, and account synchronization.

pub mod codec;
pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod ontology;
pub mod platform;
pub mod sync;
pub mod webhook;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{AccountConfig, AccountId, ConfigStore, MemoryConfigStore};
pub use error::{CoreError, LookupKind};
pub use ontology::{
    BuildReport, BuildWarning, HierarchyBuilder, ResolvedOntology, TemplateCatalog, TypeResolver,
    resolve_ontology,
};
pub use platform::{
    AlarmRuleSpec, AlarmStatusUpdate, ApiConnector, AssetCreation, AssetPlatform,
    CLIENT_REFERENCE, DataUpsert, LiveDataWrite, OntologySource, OutputChange, PlatformAlarmAck,
    Subscriber, VendorAlarmAck, VendorConnector, VendorWriter,
};
pub use sync::{
    AccountState, ApplyReport, CommittedOntology, DatapointBinding, LiveUpdate, RunOnceGate,
    SyncOutcome, SyncSummary, Synchronizer, VersionCheck, VersionGate,
};
pub use webhook::{WebhookDispatcher, WebhookOutcome, parse_webhook_path};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    // Ontology
    Asset, DataType, Ontology, Space, TemplateOwner,
    // Resolved output
    AssetFilter, AssetType, AssetTypeAttribute, Datapoint, FilterRule, MasterState,
    ResolvedNode, Subtype,
    // Runtime values
    AlarmEvent, DataValue, FlatValues,
};
