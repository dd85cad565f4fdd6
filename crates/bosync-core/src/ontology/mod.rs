// ── Ontology resolution pipeline ──
//
// types -> catalog -> hierarchy. Pure: everything lives in the values
// passed in and returned, so accounts can resolve concurrently.

pub mod catalog;
pub mod hierarchy;
pub mod report;
pub mod types;

use serde::Serialize;
use tracing::info;

use crate::error::CoreError;
use crate::model::{AssetFilter, AssetType, Ontology, ResolvedNode};

pub use catalog::{MASTER_ATTRIBUTE, TemplateCatalog};
pub use hierarchy::HierarchyBuilder;
pub use report::{BuildReport, BuildWarning};
pub use types::TypeResolver;

/// Output of one full resolution.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedOntology {
    pub version: i32,
    pub asset_types: Vec<AssetType>,
    pub root: ResolvedNode,
    pub report: BuildReport,
}

/// Resolve an ontology into exported asset types and the asset tree.
///
/// Fails only on an invalid filter; data problems are recovered and listed
/// in the returned report.
pub fn resolve_ontology(
    ontology: &Ontology,
    filter: &AssetFilter,
) -> Result<ResolvedOntology, CoreError> {
    let compiled = filter.compile()?;
    let mut report = BuildReport::default();

    let catalog = TemplateCatalog::build(ontology, &mut report);
    let asset_types = catalog.asset_types();
    let root = HierarchyBuilder::new(ontology, &catalog.lookup, &compiled).build(&mut report);

    info!(
        version = ontology.version,
        asset_types = asset_types.len(),
        nodes = root.node_count(),
        warnings = report.len(),
        "ontology resolved"
    );

    Ok(ResolvedOntology {
        version: ontology.version,
        asset_types,
        root,
        report,
    })
}
