// ── Build warnings ──
//
// Everything the resolution pipeline recovers from locally. Each warning is
// logged when recorded and kept so callers can inspect what was skipped.

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

/// A non-fatal problem found while resolving an ontology.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum BuildWarning {
    #[error("data type {type_id} referenced at {path:?} does not exist")]
    UnknownDataType { type_id: String, path: String },

    #[error("unit {unit_id} of data type {type_id} does not exist")]
    UnknownUnit { unit_id: String, type_id: String },

    #[error("data type {type_id} refers to itself via {path:?}")]
    TypeCycle { type_id: String, path: String },

    #[error("template {template_id} is owned by asset template {asset} and space template {space}")]
    TemplateOwnerConflict {
        template_id: String,
        asset: String,
        space: String,
    },

    #[error("template {template_id} belongs to neither an asset nor a space template")]
    TemplateWithoutOwner { template_id: String },

    #[error("instance {instance_id} references unknown template {template_id}")]
    UnknownTemplate {
        instance_id: String,
        template_id: String,
    },

    #[error("space {space_id} references unknown asset {asset_id}")]
    UnknownAsset { space_id: String, asset_id: String },

    #[error("{parent_id:?} already has a child {child_id}, replacing it")]
    DuplicateChild { parent_id: String, child_id: String },

    #[error("space {space_id} is part of a parent cycle")]
    SpaceCycle { space_id: String },

    #[error("value of {instance_id} could not be decoded: {reason}")]
    UndecodableValue { instance_id: String, reason: String },
}

/// Warnings collected during one build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub warnings: Vec<BuildWarning>,
}

impl BuildReport {
    pub(crate) fn push(&mut self, warning: BuildWarning) {
        warn!("{warning}");
        self.warnings.push(warning);
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn count(&self, pred: impl Fn(&BuildWarning) -> bool) -> usize {
        self.warnings.iter().filter(|w| pred(w)).count()
    }
}
