// ── Data type resolution ──
//
// Expands a (possibly complex, possibly nested) data type into its leaf
// attributes. Paths are dot-joined from the root name through the field
// names, in field declaration order.

use std::collections::HashMap;

use crate::model::{DataType, LeafAttribute, Unit};

use super::report::{BuildReport, BuildWarning};

/// Resolves data type ids against one ontology's types and units.
pub struct TypeResolver<'a> {
    types: HashMap<&'a str, &'a DataType>,
    units: HashMap<&'a str, &'a str>,
}

impl<'a> TypeResolver<'a> {
    pub fn new(types: &'a [DataType], units: &'a [Unit]) -> Self {
        Self {
            types: types.iter().map(|t| (t.id.as_str(), t)).collect(),
            units: units
                .iter()
                .map(|u| (u.id.as_str(), u.symbol.as_str()))
                .collect(),
        }
    }

    /// Resolve `type_id` into its leaves.
    ///
    /// `root_name` becomes the first path segment; without one the type's
    /// name (or id, when unnamed) is used. Unknown types, unknown units, and
    /// type cycles are recorded in `report` and resolve to nothing (types)
    /// or no unit (units).
    pub fn resolve(
        &self,
        type_id: &str,
        root_name: Option<&str>,
        report: &mut BuildReport,
    ) -> Vec<LeafAttribute> {
        let Some(&data_type) = self.types.get(type_id) else {
            report.push(BuildWarning::UnknownDataType {
                type_id: type_id.to_owned(),
                path: root_name.unwrap_or_default().to_owned(),
            });
            return Vec::new();
        };
        let mut leaves = Vec::new();
        let mut active = Vec::new();
        let path = self.root_path(type_id, root_name);
        self.expand(data_type, path, &mut active, &mut leaves, report);
        leaves
    }

    /// First path segment of every leaf `resolve` yields for these inputs.
    pub fn root_path(&self, type_id: &str, root_name: Option<&str>) -> String {
        match root_name.filter(|n| !n.is_empty()) {
            Some(name) => name.to_owned(),
            None => self
                .types
                .get(type_id)
                .map_or(type_id, |t| t.display_name())
                .to_owned(),
        }
    }

    fn expand(
        &self,
        data_type: &'a DataType,
        path: String,
        active: &mut Vec<&'a str>,
        out: &mut Vec<LeafAttribute>,
        report: &mut BuildReport,
    ) {
        if active.contains(&data_type.id.as_str()) {
            report.push(BuildWarning::TypeCycle {
                type_id: data_type.id.clone(),
                path,
            });
            return;
        }

        if !data_type.is_complex() {
            out.push(self.leaf(data_type, path, report));
            return;
        }

        active.push(&data_type.id);
        for field in &data_type.fields {
            let field_path = format!("{path}.{}", field.name);
            match self.types.get(field.type_id.as_str()) {
                Some(&field_type) => self.expand(field_type, field_path, active, out, report),
                None => report.push(BuildWarning::UnknownDataType {
                    type_id: field.type_id.clone(),
                    path: field_path,
                }),
            }
        }
        active.pop();
    }

    fn leaf(&self, data_type: &DataType, path: String, report: &mut BuildReport) -> LeafAttribute {
        let unit = data_type.unit_id.as_deref().and_then(|unit_id| {
            let symbol = self.units.get(unit_id).map(|s| (*s).to_owned());
            if symbol.is_none() {
                report.push(BuildWarning::UnknownUnit {
                    unit_id: unit_id.to_owned(),
                    type_id: data_type.id.clone(),
                });
            }
            symbol
        });
        LeafAttribute {
            path,
            unit,
            min: data_type.min,
            max: data_type.max,
            enums: data_type.enums.clone(),
        }
    }
}
