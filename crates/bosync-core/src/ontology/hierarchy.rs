// ── Hierarchy synthesis ──
//
// Turns the flat space/asset lists into a rooted tree. Spaces nest by
// `parent_id`; assets hang under the spaces that list them; assets listed
// nowhere become functional children of the root; datapoints owned by
// nothing attach to the root itself. Every node carries its instances bound
// to attributes through the catalog lookup.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::codec;
use crate::model::{
    Asset, AttributeRef, CompiledFilter, Datapoint, DatapointInstance, MasterState, Ontology,
    PropertyInstance, ROOT_ID, ResolvedNode, Space, TemplateLookup,
};

use super::report::{BuildReport, BuildWarning};

/// Instances owned by one asset or space.
#[derive(Default)]
struct Owned<'a> {
    datapoints: Vec<&'a DatapointInstance>,
    properties: Vec<&'a PropertyInstance>,
}

/// Builds the resolved tree for one ontology and one catalog lookup.
pub struct HierarchyBuilder<'a> {
    lookup: &'a TemplateLookup,
    filter: &'a CompiledFilter,
    assets: &'a [Asset],
    asset_index: HashMap<&'a str, &'a Asset>,
    /// Parent space id (`""` for the root) -> child spaces, in input order.
    children: HashMap<&'a str, Vec<&'a Space>>,
    by_asset: HashMap<&'a str, Owned<'a>>,
    by_space: HashMap<&'a str, Owned<'a>>,
    orphans: Vec<&'a DatapointInstance>,
    associated: HashSet<&'a str>,
}

impl<'a> HierarchyBuilder<'a> {
    pub fn new(ontology: &'a Ontology, lookup: &'a TemplateLookup, filter: &'a CompiledFilter) -> Self {
        let space_ids: HashSet<&str> = ontology.spaces.iter().map(|s| s.id.as_str()).collect();

        let mut children: HashMap<&str, Vec<&Space>> = HashMap::new();
        for space in &ontology.spaces {
            match space.parent_id.as_deref() {
                None => children.entry(ROOT_ID).or_default().push(space),
                Some(parent) if space_ids.contains(parent) => {
                    children.entry(parent).or_default().push(space);
                }
                Some(parent) => {
                    debug!(space_id = %space.id, parent_id = parent, "space parent not found, unreachable");
                }
            }
        }

        let mut by_asset: HashMap<&str, Owned<'_>> = HashMap::new();
        let mut by_space: HashMap<&str, Owned<'_>> = HashMap::new();
        let mut orphans = Vec::new();
        for dp in &ontology.datapoints {
            if let Some(asset) = dp.owner.asset_id.as_deref() {
                by_asset.entry(asset).or_default().datapoints.push(dp);
            }
            if let Some(space) = dp.owner.space_id.as_deref() {
                by_space.entry(space).or_default().datapoints.push(dp);
            }
            if dp.owner.is_orphan() {
                orphans.push(dp);
            }
        }
        for prop in &ontology.properties {
            if let Some(asset) = prop.owner.asset_id.as_deref() {
                by_asset.entry(asset).or_default().properties.push(prop);
            }
            if let Some(space) = prop.owner.space_id.as_deref() {
                by_space.entry(space).or_default().properties.push(prop);
            }
        }

        let associated = ontology
            .spaces
            .iter()
            .flat_map(|s| s.assets.iter().map(|a| a.id.as_str()))
            .collect();

        Self {
            lookup,
            filter,
            assets: &ontology.assets,
            asset_index: ontology.assets.iter().map(|a| (a.id.as_str(), a)).collect(),
            children,
            by_asset,
            by_space,
            orphans,
            associated,
        }
    }

    /// Build the tree. Recoverable problems go to `report`.
    pub fn build(&self, report: &mut BuildReport) -> ResolvedNode {
        let mut root = ResolvedNode::root();
        root.datapoints = self.bind_instances(&self.orphans, &[], report);

        let mut active = vec![ROOT_ID];
        self.attach_children(&mut root, None, &mut active, report);

        for asset in self.assets {
            if !self.associated.contains(asset.id.as_str()) {
                let node = self.asset_node(asset, MasterState::Slave, report);
                root.functional_children.push(node);
            }
        }
        root
    }

    /// Attach child spaces (recursively) and the assets `space` lists under
    /// `parent`. `space` is `None` for the root.
    fn attach_children(
        &self,
        parent: &mut ResolvedNode,
        space: Option<&'a Space>,
        active: &mut Vec<&'a str>,
        report: &mut BuildReport,
    ) {
        let child_spaces = self
            .children
            .get(parent.id.as_str())
            .map(Vec::as_slice)
            .unwrap_or_default();

        for &child in child_spaces {
            if active.contains(&child.id.as_str()) {
                report.push(BuildWarning::SpaceCycle {
                    space_id: child.id.clone(),
                });
                continue;
            }

            let mut node = ResolvedNode::new(&child.id, &child.name, &child.template_id);
            node.datapoints = self.owned_by_space(&child.id, report);

            active.push(&child.id);
            self.attach_children(&mut node, Some(child), active, report);
            active.pop();

            if !self.filter.matches(&node) {
                debug!(space_id = %child.id, name = %child.name, "space skipped by asset filter");
                continue;
            }
            insert_child(parent, node, report);
        }

        let Some(space) = space else {
            return;
        };
        for attachment in &space.assets {
            let Some(asset) = self.asset_index.get(attachment.id.as_str()) else {
                report.push(BuildWarning::UnknownAsset {
                    space_id: space.id.clone(),
                    asset_id: attachment.id.clone(),
                });
                continue;
            };

            let node = self.asset_node(asset, attachment.is_master.into(), report);
            if !self.filter.matches(&node) {
                debug!(asset_id = %asset.id, name = %asset.name, "asset skipped by asset filter");
                continue;
            }
            insert_child(parent, node, report);
        }
    }

    fn asset_node(&self, asset: &Asset, master: MasterState, report: &mut BuildReport) -> ResolvedNode {
        let mut node = ResolvedNode::new(&asset.id, &asset.name, &asset.template_id);
        node.is_master = master;
        node.datapoints = match self.by_asset.get(asset.id.as_str()) {
            Some(owned) => self.bind_instances(&owned.datapoints, &owned.properties, report),
            None => Vec::new(),
        };
        node
    }

    fn owned_by_space(&self, space_id: &str, report: &mut BuildReport) -> Vec<Datapoint> {
        match self.by_space.get(space_id) {
            Some(owned) => self.bind_instances(&owned.datapoints, &owned.properties, report),
            None => Vec::new(),
        }
    }

    /// Bind instances to their template's attributes, decoding property
    /// values. Instances with an unknown template are skipped.
    fn bind_instances(
        &self,
        datapoints: &[&DatapointInstance],
        properties: &[&PropertyInstance],
        report: &mut BuildReport,
    ) -> Vec<Datapoint> {
        let mut out = Vec::with_capacity(datapoints.len() + properties.len());

        for dp in datapoints {
            if let Some(record) = self.bind(&dp.id, &dp.template_id, report) {
                out.push(record);
            }
        }

        for prop in properties {
            let Some(mut record) = self.bind(&prop.id, &prop.template_id, report) else {
                continue;
            };
            if let Some(value) = &prop.value {
                let names = record.attribute_names();
                match codec::decode_value(value, &record.attribute_name_prefix, &names) {
                    Ok(data) => record.data = Some(data),
                    Err(e) => report.push(BuildWarning::UndecodableValue {
                        instance_id: prop.id.clone(),
                        reason: e.to_string(),
                    }),
                }
            }
            out.push(record);
        }
        out
    }

    fn bind(&self, instance_id: &str, template_id: &str, report: &mut BuildReport) -> Option<Datapoint> {
        let Some(binding) = self.lookup.get(template_id) else {
            report.push(BuildWarning::UnknownTemplate {
                instance_id: instance_id.to_owned(),
                template_id: template_id.to_owned(),
            });
            return None;
        };
        Some(Datapoint {
            subtype: binding.subtype,
            provider_id: instance_id.to_owned(),
            attribute_name_prefix: binding.name.clone(),
            attributes: binding
                .attributes
                .iter()
                .map(|name| AttributeRef { name: name.clone() })
                .collect(),
            data: None,
        })
    }
}

fn insert_child(parent: &mut ResolvedNode, child: ResolvedNode, report: &mut BuildReport) {
    let key = child.id.clone();
    if parent.locational_children.insert(key.clone(), child).is_some() {
        report.push(BuildWarning::DuplicateChild {
            parent_id: parent.id.clone(),
            child_id: key,
        });
    }
}
