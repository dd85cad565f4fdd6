// ── Asset filters ──
//
// A filter is OR-of-ANDs: a node passes when every rule of at least one
// group matches. Rules address node fields by name through an explicit
// accessor table.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::node::ResolvedNode;
use crate::error::CoreError;

/// `{parameter, regex}` as configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRule {
    pub parameter: String,
    pub regex: String,
}

/// Configured filter groups. Empty means "keep everything".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetFilter(pub Vec<Vec<FilterRule>>);

impl AssetFilter {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compile every pattern. One invalid pattern fails the whole filter.
    pub fn compile(&self) -> Result<CompiledFilter, CoreError> {
        let groups = self
            .0
            .iter()
            .map(|group| {
                group
                    .iter()
                    .map(|rule| {
                        let regex = Regex::new(&rule.regex).map_err(|e| {
                            CoreError::InvalidFilter {
                                pattern: rule.regex.clone(),
                                reason: e.to_string(),
                            }
                        })?;
                        Ok(CompiledRule {
                            field: NodeField::parse(&rule.parameter),
                            parameter: rule.parameter.clone(),
                            regex,
                        })
                    })
                    .collect::<Result<Vec<_>, CoreError>>()
            })
            .collect::<Result<Vec<_>, CoreError>>()?;
        Ok(CompiledFilter { groups })
    }
}

/// Node fields a rule may address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeField {
    Id,
    Name,
    TemplateId,
    IsMaster,
}

impl NodeField {
    fn parse(parameter: &str) -> Option<Self> {
        match parameter {
            "id" => Some(Self::Id),
            "name" => Some(Self::Name),
            "templateID" => Some(Self::TemplateId),
            "is_master" => Some(Self::IsMaster),
            _ => None,
        }
    }

    fn value(self, node: &ResolvedNode) -> String {
        match self {
            Self::Id => node.id.clone(),
            Self::Name => node.name.clone(),
            Self::TemplateId => node.template_id.clone(),
            Self::IsMaster => node.is_master.ordinal().to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    parameter: String,
    field: Option<NodeField>,
    regex: Regex,
}

impl CompiledRule {
    fn matches(&self, node: &ResolvedNode) -> bool {
        let Some(field) = self.field else {
            debug!(parameter = %self.parameter, "filter rule names an unknown field");
            return false;
        };
        self.regex.is_match(&field.value(node))
    }
}

/// A filter ready for evaluation.
#[derive(Debug, Clone, Default)]
pub struct CompiledFilter {
    groups: Vec<Vec<CompiledRule>>,
}

impl CompiledFilter {
    pub fn matches(&self, node: &ResolvedNode) -> bool {
        self.groups.is_empty()
            || self
                .groups
                .iter()
                .any(|group| group.iter().all(|rule| rule.matches(node)))
    }
}
