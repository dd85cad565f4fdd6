// ── Ontology document ──
//
// Canonical form of the vendor's export. Owner references that the wire
// format leaves as empty strings are `None` here, so "orphan" and "belongs
// to nothing" are the same check everywhere.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::value::DataValue;

/// Full vendor ontology at one structure version.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ontology {
    pub version: i32,
    pub asset_templates: Vec<TemplateHeader>,
    pub space_templates: Vec<TemplateHeader>,
    pub units: Vec<Unit>,
    pub data_types: Vec<DataType>,
    pub datapoint_templates: Vec<DatapointTemplate>,
    pub property_templates: Vec<PropertyTemplate>,
    pub assets: Vec<Asset>,
    pub spaces: Vec<Space>,
    pub datapoints: Vec<DatapointInstance>,
    pub properties: Vec<PropertyInstance>,
}

/// Asset or space template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateHeader {
    pub id: String,
    pub name: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: String,
    pub symbol: String,
}

/// A named sub-field of a complex data type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataTypeField {
    pub name: String,
    pub type_id: String,
}

/// A primitive or complex data type. Complex types carry `fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataType {
    pub id: String,
    pub format: String,
    pub name: String,
    pub unit_id: Option<String>,
    pub fields: Vec<DataTypeField>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Ordinal -> label.
    pub enums: BTreeMap<String, String>,
}

impl DataType {
    pub fn is_complex(&self) -> bool {
        !self.fields.is_empty()
    }

    /// Name used as a leaf path when the caller gives none.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() { &self.id } else { &self.name }
    }
}

/// Which template a datapoint or property template belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemplateOwner {
    Asset(String),
    Space(String),
    /// Both ids set. A data error; such templates are skipped.
    Conflicting { asset: String, space: String },
    Unowned,
}

impl TemplateOwner {
    pub(crate) fn from_ids(asset: Option<String>, space: Option<String>) -> Self {
        match (asset, space) {
            (Some(asset), Some(space)) => Self::Conflicting { asset, space },
            (Some(asset), None) => Self::Asset(asset),
            (None, Some(space)) => Self::Space(space),
            (None, None) => Self::Unowned,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatapointTemplate {
    pub id: String,
    pub name: String,
    pub owner: TemplateOwner,
    pub type_id: String,
    pub direction: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyTemplate {
    pub id: String,
    pub name: String,
    pub owner: TemplateOwner,
    pub type_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    pub name: String,
    pub template_id: String,
}

/// An asset attached to a space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceAssetRef {
    pub id: String,
    pub is_master: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    pub id: String,
    pub name: String,
    /// `None` for top-level spaces (children of the synthetic root).
    pub parent_id: Option<String>,
    pub template_id: String,
    pub assets: Vec<SpaceAssetRef>,
}

/// Owner of a datapoint or property instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceOwner {
    pub asset_id: Option<String>,
    pub space_id: Option<String>,
}

impl InstanceOwner {
    pub fn is_orphan(&self) -> bool {
        self.asset_id.is_none() && self.space_id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatapointInstance {
    pub id: String,
    pub template_id: String,
    pub owner: InstanceOwner,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyInstance {
    pub id: String,
    pub template_id: String,
    pub owner: InstanceOwner,
    pub value: Option<DataValue>,
}

/// Empty wire strings mean "not set".
pub(crate) fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}
