// ── Template catalog ──
//
// Merges asset/space templates with their datapoint and property templates
// and resolved leaves. Produces the asset types exported to the platform and
// the lookup that binds instances to attributes. The lookup belongs to one
// build; nothing here is shared between accounts.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::model::node::asset_type_name;
use crate::model::template::sorted_enum;
use crate::model::{
    AssetType, AssetTypeAttribute, DatapointTemplate, DatapointTemplateInfo, EnumMapping,
    LeafAttribute, Ontology, PropertyTemplate, PropertyTemplateInfo, ROOT_TEMPLATE_ID,
    ResolvedTemplate, Subtype, TemplateBinding, TemplateKind, TemplateLookup, TemplateOwner,
};

use super::report::{BuildReport, BuildWarning};
use super::types::TypeResolver;

/// Name of the synthetic redundancy attribute on every asset type.
pub const MASTER_ATTRIBUTE: &str = "is_master";
const TRANSLATION_PREFIX: &str = "BOS ";

/// Resolved templates plus the instance binding lookup.
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    pub templates: Vec<ResolvedTemplate>,
    pub lookup: TemplateLookup,
}

impl TemplateCatalog {
    /// Build the catalog for one ontology.
    ///
    /// Templates come out in order: asset templates, space templates, then
    /// the synthetic root holding the datapoint templates of orphan
    /// instances.
    pub fn build(ontology: &Ontology, report: &mut BuildReport) -> Self {
        let resolver = TypeResolver::new(&ontology.data_types, &ontology.units);

        let mut datapoints_by_owner: HashMap<&str, Vec<&DatapointTemplate>> = HashMap::new();
        for template in &ontology.datapoint_templates {
            if let Some(owner) = owner_id(&template.id, &template.owner, report) {
                datapoints_by_owner.entry(owner).or_default().push(template);
            }
        }
        let mut properties_by_owner: HashMap<&str, Vec<&PropertyTemplate>> = HashMap::new();
        for template in &ontology.property_templates {
            if let Some(owner) = owner_id(&template.id, &template.owner, report) {
                properties_by_owner.entry(owner).or_default().push(template);
            }
        }

        let mut catalog = Self::default();

        let headers = ontology
            .asset_templates
            .iter()
            .map(|h| (h, TemplateKind::Asset))
            .chain(ontology.space_templates.iter().map(|h| (h, TemplateKind::Space)));
        for (header, kind) in headers {
            let datapoints = datapoints_by_owner.remove(header.id.as_str()).unwrap_or_default();
            let properties = properties_by_owner.remove(header.id.as_str()).unwrap_or_default();
            let template = catalog.resolve_template(
                &resolver,
                TemplateSpec {
                    id: &header.id,
                    name: &header.name,
                    kind,
                    tags: &header.tags,
                },
                &datapoints,
                &properties,
                report,
            );
            catalog.templates.push(template);
        }

        let orphans = orphan_templates(ontology);
        let root = catalog.resolve_template(
            &resolver,
            TemplateSpec {
                id: ROOT_TEMPLATE_ID,
                name: ROOT_TEMPLATE_ID,
                kind: TemplateKind::Root,
                tags: &[],
            },
            &orphans,
            &[],
            report,
        );
        catalog.templates.push(root);

        debug!(
            templates = catalog.templates.len(),
            bindings = catalog.lookup.len(),
            "template catalog built"
        );
        catalog
    }

    fn resolve_template(
        &mut self,
        resolver: &TypeResolver<'_>,
        spec: TemplateSpec<'_>,
        datapoints: &[&DatapointTemplate],
        properties: &[&PropertyTemplate],
        report: &mut BuildReport,
    ) -> ResolvedTemplate {
        let datapoints: Vec<DatapointTemplateInfo> = datapoints
            .iter()
            .map(|dp| {
                let attributes = resolver.resolve(&dp.type_id, Some(&dp.name), report);
                let prefix = resolver.root_path(&dp.type_id, Some(&dp.name));
                self.bind(&dp.id, prefix, Subtype::from_direction(&dp.direction), &attributes);
                DatapointTemplateInfo {
                    id: dp.id.clone(),
                    name: dp.name.clone(),
                    direction: dp.direction.clone(),
                    attributes,
                }
            })
            .collect();

        let properties: Vec<PropertyTemplateInfo> = properties
            .iter()
            .map(|prop| {
                let attributes = resolver.resolve(&prop.type_id, Some(&prop.name), report);
                let prefix = resolver.root_path(&prop.type_id, Some(&prop.name));
                self.bind(&prop.id, prefix, Subtype::Status, &attributes);
                PropertyTemplateInfo {
                    id: prop.id.clone(),
                    name: prop.name.clone(),
                    attributes,
                }
            })
            .collect();

        ResolvedTemplate {
            id: spec.id.to_owned(),
            name: spec.name.to_owned(),
            kind: spec.kind,
            tags: spec.tags.to_vec(),
            datapoints,
            properties,
        }
    }

    fn bind(
        &mut self,
        template_id: &str,
        name: String,
        subtype: Subtype,
        attributes: &[LeafAttribute],
    ) {
        self.lookup.insert(
            template_id.to_owned(),
            TemplateBinding {
                name,
                subtype,
                attributes: attributes.iter().map(|a| a.path.clone()).collect(),
            },
        );
    }

    /// Asset types as exported to the platform, one per template.
    pub fn asset_types(&self) -> Vec<AssetType> {
        self.templates.iter().map(export_asset_type).collect()
    }

    pub fn binding(&self, template_id: &str) -> Option<&TemplateBinding> {
        self.lookup.get(template_id)
    }
}

struct TemplateSpec<'a> {
    id: &'a str,
    name: &'a str,
    kind: TemplateKind,
    tags: &'a [String],
}

fn owner_id<'a>(
    template_id: &str,
    owner: &'a TemplateOwner,
    report: &mut BuildReport,
) -> Option<&'a str> {
    match owner {
        TemplateOwner::Asset(id) | TemplateOwner::Space(id) => Some(id.as_str()),
        TemplateOwner::Conflicting { asset, space } => {
            report.push(BuildWarning::TemplateOwnerConflict {
                template_id: template_id.to_owned(),
                asset: asset.clone(),
                space: space.clone(),
            });
            None
        }
        TemplateOwner::Unowned => {
            report.push(BuildWarning::TemplateWithoutOwner {
                template_id: template_id.to_owned(),
            });
            None
        }
    }
}

/// Datapoint templates referenced by instances without an owner, once each,
/// in template declaration order.
fn orphan_templates(ontology: &Ontology) -> Vec<&DatapointTemplate> {
    let referenced: HashSet<&str> = ontology
        .datapoints
        .iter()
        .filter(|dp| dp.owner.is_orphan())
        .map(|dp| dp.template_id.as_str())
        .collect();
    ontology
        .datapoint_templates
        .iter()
        .filter(|t| referenced.contains(t.id.as_str()))
        .collect()
}

// ── Export ───────────────────────────────────────────────────────────

fn export_asset_type(template: &ResolvedTemplate) -> AssetType {
    let mut attributes = Vec::new();

    for dp in &template.datapoints {
        let subtype = Subtype::from_direction(&dp.direction);
        attributes.extend(dp.attributes.iter().map(|leaf| export_attribute(leaf, subtype)));
    }
    for prop in &template.properties {
        attributes.extend(
            prop.attributes
                .iter()
                .map(|leaf| export_attribute(leaf, Subtype::Status)),
        );
    }
    attributes.push(master_attribute());

    AssetType {
        name: asset_type_name(&template.id),
        translation: format!("{TRANSLATION_PREFIX}{}", template.name),
        attributes,
    }
}

fn export_attribute(leaf: &LeafAttribute, subtype: Subtype) -> AssetTypeAttribute {
    AssetTypeAttribute {
        name: leaf.path.clone(),
        subtype,
        min: leaf.min,
        max: leaf.max,
        unit: leaf.unit.clone(),
        enum_map: sorted_enum(&leaf.enums),
        is_digital: false,
    }
}

fn master_attribute() -> AssetTypeAttribute {
    let entry = |value: &str, map: &str| EnumMapping {
        value: value.to_owned(),
        map: map.to_owned(),
    };
    AssetTypeAttribute {
        name: MASTER_ATTRIBUTE.to_owned(),
        subtype: Subtype::Property,
        min: None,
        max: None,
        unit: None,
        enum_map: vec![
            entry("-1", "Not available"),
            entry("0", "Slave"),
            entry("1", "Master"),
        ],
        is_digital: true,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::model::{
        DataType, DataTypeField, DatapointInstance, InstanceOwner, TemplateHeader, Unit,
    };

    fn header(id: &str, name: &str) -> TemplateHeader {
        TemplateHeader {
            id: id.into(),
            name: name.into(),
            tags: vec!["hvac".into()],
        }
    }

    fn float_type() -> DataType {
        DataType {
            id: "t-float".into(),
            format: "float".into(),
            name: "Float".into(),
            unit_id: Some("u-c".into()),
            fields: Vec::new(),
            min: None,
            max: None,
            enums: BTreeMap::new(),
        }
    }

    fn datapoint_template(id: &str, name: &str, owner: TemplateOwner, direction: &str) -> DatapointTemplate {
        DatapointTemplate {
            id: id.into(),
            name: name.into(),
            owner,
            type_id: "t-float".into(),
            direction: direction.into(),
        }
    }

    fn fixture() -> Ontology {
        Ontology {
            version: 1,
            asset_templates: vec![header("asset-template-1", "Temperature Sensor")],
            space_templates: vec![header("st-room", "Room")],
            units: vec![Unit {
                id: "u-c".into(),
                symbol: "°C".into(),
            }],
            data_types: vec![
                float_type(),
                DataType {
                    id: "t-state".into(),
                    format: "complex".into(),
                    name: "State".into(),
                    unit_id: None,
                    fields: vec![DataTypeField {
                        name: "level".into(),
                        type_id: "t-float".into(),
                    }],
                    min: None,
                    max: None,
                    enums: BTreeMap::new(),
                },
            ],
            datapoint_templates: vec![
                datapoint_template(
                    "dpt-temp",
                    "Temperature",
                    TemplateOwner::Asset("asset-template-1".into()),
                    "feedback",
                ),
                datapoint_template(
                    "dpt-set",
                    "Setpoint",
                    TemplateOwner::Space("st-room".into()),
                    "command",
                ),
                datapoint_template(
                    "dpt-both",
                    "Broken",
                    TemplateOwner::Conflicting {
                        asset: "asset-template-1".into(),
                        space: "st-room".into(),
                    },
                    "feedback",
                ),
                datapoint_template("dpt-orphan", "Outside", TemplateOwner::Unowned, "info"),
            ],
            property_templates: vec![PropertyTemplate {
                id: "pt-state".into(),
                name: "Status".into(),
                owner: TemplateOwner::Asset("asset-template-1".into()),
                type_id: "t-state".into(),
            }],
            datapoints: vec![
                DatapointInstance {
                    id: "dp-o1".into(),
                    template_id: "dpt-orphan".into(),
                    owner: InstanceOwner::default(),
                },
                DatapointInstance {
                    id: "dp-o2".into(),
                    template_id: "dpt-orphan".into(),
                    owner: InstanceOwner::default(),
                },
            ],
            ..Ontology::default()
        }
    }

    #[test]
    fn templates_in_asset_space_root_order() {
        let mut report = BuildReport::default();
        let catalog = TemplateCatalog::build(&fixture(), &mut report);

        let ids: Vec<_> = catalog.templates.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["asset-template-1", "st-room", "root"]);

        let root = &catalog.templates[2];
        assert_eq!(root.kind, TemplateKind::Root);
        assert_eq!(root.datapoints.len(), 1, "orphan template deduplicated");
        assert_eq!(root.datapoints[0].id, "dpt-orphan");
    }

    #[test]
    fn conflicting_and_unowned_templates_are_reported() {
        let mut report = BuildReport::default();
        let catalog = TemplateCatalog::build(&fixture(), &mut report);

        assert_eq!(
            report.count(|w| matches!(w, BuildWarning::TemplateOwnerConflict { .. })),
            1
        );
        assert_eq!(
            report.count(|w| matches!(w, BuildWarning::TemplateWithoutOwner { .. })),
            1
        );
        assert!(catalog.binding("dpt-both").is_none());
        // The unowned template is still bound through the root.
        assert!(catalog.binding("dpt-orphan").is_some());
    }

    #[test]
    fn exported_types_carry_subtypes_and_master() {
        let mut report = BuildReport::default();
        let types = TemplateCatalog::build(&fixture(), &mut report).asset_types();

        let sensor = &types[0];
        assert_eq!(sensor.name, "bos_asset-template-1");
        assert_eq!(sensor.translation, "BOS Temperature Sensor");

        let temp = sensor.attribute("Temperature").unwrap();
        assert_eq!(temp.subtype, Subtype::Input);
        assert_eq!(temp.unit.as_deref(), Some("°C"));

        let level = sensor.attribute("Status.level").unwrap();
        assert_eq!(level.subtype, Subtype::Status);

        let master = sensor.attribute(MASTER_ATTRIBUTE).unwrap();
        assert!(master.is_digital);
        assert_eq!(master.subtype, Subtype::Property);
        let values: Vec<_> = master.enum_map.iter().map(|e| e.value.as_str()).collect();
        assert_eq!(values, ["-1", "0", "1"]);

        let room = &types[1];
        assert_eq!(room.attribute("Setpoint").unwrap().subtype, Subtype::Output);
        assert_eq!(room.attributes.len(), 2);
    }

    #[test]
    fn lookup_binds_prefix_and_attributes() {
        let mut report = BuildReport::default();
        let catalog = TemplateCatalog::build(&fixture(), &mut report);

        let binding = catalog.binding("pt-state").unwrap();
        assert_eq!(binding.name, "Status");
        assert_eq!(binding.subtype, Subtype::Status);
        assert_eq!(binding.attributes, ["Status.level"]);
    }
}
