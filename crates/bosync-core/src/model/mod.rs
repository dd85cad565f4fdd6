// ── Domain model ──
//
// Canonical engine types: the ingested ontology, resolved templates and
// exported asset types, the synthesized hierarchy, runtime values, filters,
// and alarms.

pub mod alarm;
pub mod filter;
pub mod node;
pub mod ontology;
pub mod template;
pub mod value;

// ── Re-exports ──────────────────────────────────────────────────────

pub use alarm::{AlarmEvent, AlarmMessage};
pub use filter::{AssetFilter, CompiledFilter, FilterRule};
pub use node::{AttributeRef, Datapoint, MasterState, ROOT_ID, ROOT_TEMPLATE_ID, ResolvedNode};
pub use ontology::{
    Asset, DataType, DataTypeField, DatapointInstance, DatapointTemplate, InstanceOwner, Ontology,
    PropertyInstance, PropertyTemplate, Space, SpaceAssetRef, TemplateHeader, TemplateOwner, Unit,
};
pub use template::{
    AssetType, AssetTypeAttribute, DatapointTemplateInfo, EnumMapping, LeafAttribute,
    PropertyTemplateInfo, ResolvedTemplate, Subtype, TemplateBinding, TemplateKind,
    TemplateLookup,
};
pub use value::{DataValue, FlatValues};
