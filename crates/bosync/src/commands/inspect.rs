//! Offline resolution of an ontology document.

use std::fmt::Write;

use serde::Serialize;

use bosync_api::models::OntologyDto;
use bosync_core::{AssetFilter, AssetType, Ontology, ResolvedNode, ResolvedOntology, resolve_ontology};

use crate::cli::{GlobalOpts, InspectArgs, InspectView};
use crate::commands::load_config;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct InspectSummary {
    version: i32,
    asset_types: usize,
    nodes: usize,
    datapoints: usize,
    warnings: Vec<String>,
}

impl From<&ResolvedOntology> for InspectSummary {
    fn from(resolved: &ResolvedOntology) -> Self {
        let mut datapoints = 0;
        resolved.root.walk(&mut |node| datapoints += node.datapoints.len());
        Self {
            version: resolved.version,
            asset_types: resolved.asset_types.len(),
            nodes: resolved.root.node_count(),
            datapoints,
            warnings: resolved
                .report
                .warnings
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

pub fn handle(args: &InspectArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let raw = std::fs::read(&args.file)?;
    let dto: OntologyDto = serde_json::from_slice(&raw)?;
    let ontology = Ontology::from(dto);

    let filter = match args.account.as_deref() {
        Some(name) => {
            let config = load_config(global)?;
            let profile = config.accounts.get(name).ok_or_else(|| CliError::NotFound {
                resource_type: "account".into(),
                identifier: name.into(),
                list_command: "config show".into(),
            })?;
            profile.filter.clone()
        }
        None => AssetFilter::default(),
    };

    let resolved = resolve_ontology(&ontology, &filter)?;

    let out = match args.show {
        InspectView::Summary => {
            output::render(global.output, &InspectSummary::from(&resolved), summary_text)?
        }
        InspectView::Tree => output::render(global.output, &resolved.root, tree_text)?,
        InspectView::Types => output::render(global.output, &resolved.asset_types, |t| types_text(t))?,
        InspectView::Warnings => {
            let summary = InspectSummary::from(&resolved);
            output::render(global.output, &summary.warnings, |w| w.join("\n"))?
        }
    };
    output::print_output(&out);
    Ok(())
}

// ── Text views ───────────────────────────────────────────────────────

fn summary_text(s: &InspectSummary) -> String {
    let mut out = format!(
        "version {}: {} asset types, {} nodes, {} datapoints, {} warnings",
        s.version,
        s.asset_types,
        s.nodes,
        s.datapoints,
        s.warnings.len()
    );
    for warning in &s.warnings {
        let _ = write!(out, "\n  warning: {warning}");
    }
    out
}

fn tree_text(root: &ResolvedNode) -> String {
    let mut out = String::new();
    write_node(&mut out, root, 0, "");
    out.trim_end().to_owned()
}

fn write_node(out: &mut String, node: &ResolvedNode, depth: usize, marker: &str) {
    let _ = writeln!(
        out,
        "{:indent$}{marker}{} [{}] {} datapoints",
        "",
        node.name,
        node.template_id,
        node.datapoints.len(),
        indent = depth * 2
    );
    for child in node.locational_children.values() {
        write_node(out, child, depth + 1, "");
    }
    for child in &node.functional_children {
        write_node(out, child, depth + 1, "~ ");
    }
}

fn types_text(types: &[AssetType]) -> String {
    let mut out = String::new();
    for asset_type in types {
        let _ = writeln!(out, "{} ({})", asset_type.name, asset_type.translation);
        for attr in &asset_type.attributes {
            let _ = match &attr.unit {
                Some(unit) => writeln!(out, "  {} {} [{unit}]", attr.subtype, attr.name),
                None => writeln!(out, "  {} {}", attr.subtype, attr.name),
            };
        }
    }
    out.trim_end().to_owned()
}
