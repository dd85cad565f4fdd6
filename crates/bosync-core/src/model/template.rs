// ── Resolved templates and exported asset types ──

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A flattened terminal of a (possibly complex) data type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafAttribute {
    /// Dot-joined path from the root name through nested field names.
    pub path: String,
    pub unit: Option<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub enums: BTreeMap<String, String>,
}

/// Attribute category on the asset platform.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Subtype {
    Input,
    Output,
    Info,
    Status,
    Property,
}

impl Subtype {
    /// Map a vendor datapoint direction onto a subtype.
    ///
    /// `feedback` is read-only (input); `command` and `commandAndFeedback`
    /// are writable (output); anything else is informational.
    pub fn from_direction(direction: &str) -> Self {
        match direction.to_ascii_lowercase().as_str() {
            "feedback" => Self::Input,
            "command" | "commandandfeedback" => Self::Output,
            _ => Self::Info,
        }
    }
}

/// A datapoint template with its resolved leaves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatapointTemplateInfo {
    pub id: String,
    pub name: String,
    pub direction: String,
    pub attributes: Vec<LeafAttribute>,
}

/// A property template with its resolved leaves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyTemplateInfo {
    pub id: String,
    pub name: String,
    pub attributes: Vec<LeafAttribute>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum TemplateKind {
    Asset,
    Space,
    Root,
}

/// An asset/space template merged with its datapoint and property
/// definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedTemplate {
    pub id: String,
    pub name: String,
    pub kind: TemplateKind,
    pub tags: Vec<String>,
    pub datapoints: Vec<DatapointTemplateInfo>,
    pub properties: Vec<PropertyTemplateInfo>,
}

// ── Exported schema ──────────────────────────────────────────────────

/// One enumeration entry, exported sorted by ordinal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumMapping {
    pub value: String,
    pub map: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetTypeAttribute {
    pub name: String,
    pub subtype: Subtype,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enum_map: Vec<EnumMapping>,
    pub is_digital: bool,
}

/// Asset type as created on the asset platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetType {
    pub name: String,
    pub translation: String,
    pub attributes: Vec<AssetTypeAttribute>,
}

impl AssetType {
    pub fn attribute(&self, name: &str) -> Option<&AssetTypeAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

// ── Instance binding lookup ──────────────────────────────────────────

/// Resolved metadata for one datapoint or property template, used to bind
/// instances to their attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateBinding {
    /// Attribute-name prefix (the leaf path root).
    pub name: String,
    pub subtype: Subtype,
    pub attributes: Vec<String>,
}

/// Datapoint/property template id -> binding. Scoped to one catalog build.
pub type TemplateLookup = HashMap<String, TemplateBinding>;

/// Sort an ordinal -> label map numerically (falling back to string order
/// for non-numeric ordinals).
pub(crate) fn sorted_enum(enums: &BTreeMap<String, String>) -> Vec<EnumMapping> {
    let mut entries: Vec<EnumMapping> = enums
        .iter()
        .map(|(value, map)| EnumMapping {
            value: value.clone(),
            map: map.clone(),
        })
        .collect();
    entries.sort_by(|a, b| match (a.value.parse::<i64>(), b.value.parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => std::cmp::Ordering::Less,
        (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
        (Err(_), Err(_)) => a.value.cmp(&b.value),
    });
    entries
}
