// ── Resolved hierarchy ──

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::template::Subtype;
use super::value::FlatValues;

/// Id of the synthetic root space.
pub const ROOT_ID: &str = "";
/// Template id of the synthetic root.
pub const ROOT_TEMPLATE_ID: &str = "root";
const ROOT_NAME: &str = "BOS";
const ID_PREFIX: &str = "bos_";

/// Redundancy flag of an asset's attachment to a space.
///
/// Exported through the synthetic `is_master` attribute as 0/1. Spaces,
/// the root and unattached assets carry `Slave`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MasterState {
    #[default]
    Slave,
    Master,
}

impl MasterState {
    pub fn ordinal(self) -> i8 {
        match self {
            Self::Slave => 0,
            Self::Master => 1,
        }
    }
}

impl From<bool> for MasterState {
    fn from(master: bool) -> Self {
        if master { Self::Master } else { Self::Slave }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRef {
    pub name: String,
}

/// A datapoint or property instance bound to its resolved attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datapoint {
    pub subtype: Subtype,
    /// Vendor instance id.
    pub provider_id: String,
    pub attribute_name_prefix: String,
    pub attributes: Vec<AttributeRef>,
    /// Decoded property value, flat by attribute name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<FlatValues>,
}

impl Datapoint {
    pub fn attribute_names(&self) -> Vec<String> {
        self.attributes.iter().map(|a| a.name.clone()).collect()
    }
}

/// One node of the synthesized tree: the root, a space, or an asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedNode {
    pub id: String,
    pub name: String,
    pub template_id: String,
    pub is_master: MasterState,
    /// Spaces and assets nested by physical containment, keyed by id.
    pub locational_children: IndexMap<String, ResolvedNode>,
    /// Assets attached to no space. Only populated on the root.
    pub functional_children: Vec<ResolvedNode>,
    pub datapoints: Vec<Datapoint>,
}

impl ResolvedNode {
    pub fn new(id: impl Into<String>, name: impl Into<String>, template_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            template_id: template_id.into(),
            is_master: MasterState::Slave,
            locational_children: IndexMap::new(),
            functional_children: Vec::new(),
            datapoints: Vec::new(),
        }
    }

    pub fn root() -> Self {
        Self::new(ROOT_ID, ROOT_NAME, ROOT_TEMPLATE_ID)
    }

    pub fn is_root(&self) -> bool {
        self.id == ROOT_ID
    }

    /// Global asset identifier on the platform.
    pub fn gai(&self) -> String {
        format!("{ID_PREFIX}{}", self.id)
    }

    /// Name of the exported asset type for this node's template.
    pub fn asset_type_name(&self) -> String {
        asset_type_name(&self.template_id)
    }

    /// Depth-first pre-order visit of this node and all descendants.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a ResolvedNode)) {
        visit(self);
        for child in self.locational_children.values() {
            child.walk(visit);
        }
        for child in &self.functional_children {
            child.walk(visit);
        }
    }

    /// Total node count including this one.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        self.walk(&mut |_| count += 1);
        count
    }

    /// Follow locational children by name, e.g. `["Building 1", "Floor 1"]`.
    pub fn find_by_names(&self, names: &[&str]) -> Option<&ResolvedNode> {
        let Some((first, rest)) = names.split_first() else {
            return Some(self);
        };
        self.locational_children
            .values()
            .find(|c| c.name == *first)
            .and_then(|c| c.find_by_names(rest))
    }
}

/// `bos_{template_id}`.
pub fn asset_type_name(template_id: &str) -> String {
    format!("{ID_PREFIX}{template_id}")
}
