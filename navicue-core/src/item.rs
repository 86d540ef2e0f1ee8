//! Canonical content item (NaviCue)
//!
//! The only item shape the query and statistics engines ever see. Both source
//! shapes are translated into this at the normalizer boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::classification::{HeatLevel, KbeStage};
use crate::error::LifecycleError;
use crate::lifecycle::{authorize, Role, Status, StatusTransition};

/// Facet value for items with no resolvable schema/family/pillar
pub const UNMAPPED: &str = "Unmapped";

/// Display text for items whose source carries no copy
pub const NO_COPY: &str = "No copy";

/// Taxonomy level a target points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeType {
    Schema,
    Family,
    Mindblock,
}

impl ScopeType {
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "schema" => Some(ScopeType::Schema),
            "family" => Some(ScopeType::Family),
            "mindblock" => Some(ScopeType::Mindblock),
            _ => None,
        }
    }
}

impl fmt::Display for ScopeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScopeType::Schema => "schema",
            ScopeType::Family => "family",
            ScopeType::Mindblock => "mindblock",
        };
        f.write_str(name)
    }
}

/// Link from an item to a taxonomy node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryTarget {
    pub scope_type: ScopeType,
    pub scope_id: String,
    /// Display label from the source record or the resolved node's title
    pub label: Option<String>,
    /// False when `scope_id` is not present in the taxonomy
    pub resolved: bool,
}

/// Which source shape an item was translated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceShape {
    Legacy,
    Versioned,
}

/// Canonical NaviCue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    /// Human name; the registry code for versioned records
    pub name: String,
    /// Primary display text (`NO_COPY` when the source has none)
    pub text_line: String,
    pub missing_copy: bool,
    pub status: Status,
    pub batch: u32,
    pub tags: BTreeSet<String>,
    pub targets: Vec<PrimaryTarget>,
    /// Schema facet value
    pub schema: String,
    /// Family facet value
    pub family: String,
    /// Pillar facet value
    pub pillar: String,
    pub heat_level: Option<HeatLevel>,
    /// KBE layer exactly as the source wrote it
    pub kbe_layer: Option<String>,
    /// Canonical stage recognized from `kbe_layer`
    pub kbe_stage: Option<KbeStage>,
    pub response_type: Option<String>,
    pub council_lens: Option<String>,
    pub source_shape: SourceShape,
    pub created_at: Option<DateTime<Utc>>,
    pub exposures_count: Option<u64>,
    pub completions_count: Option<u64>,
    pub avg_effectiveness: Option<f64>,
}

impl ContentItem {
    /// KBE facet value: the canonical stage name, else the raw layer
    pub fn kbe_label(&self) -> Option<&str> {
        match self.kbe_stage {
            Some(stage) => Some(stage.as_str()),
            None => self.kbe_layer.as_deref(),
        }
    }

    /// Targets that did not resolve against the taxonomy
    pub fn unmapped_targets(&self) -> impl Iterator<Item = &PrimaryTarget> {
        self.targets.iter().filter(|t| !t.resolved)
    }

    /// True when the item has no schema or any target failed to resolve
    pub fn is_unmapped(&self) -> bool {
        self.schema == UNMAPPED || self.unmapped_targets().next().is_some()
    }

    /// Mapping facet value: `"mapped"` or `"unmapped"`
    pub fn mapping(&self) -> &'static str {
        if self.is_unmapped() {
            "unmapped"
        } else {
            "mapped"
        }
    }

    /// Move the item to a new status on behalf of `role`
    ///
    /// The item is left untouched when the transition is rejected.
    pub fn apply_transition(
        &mut self,
        to: Status,
        role: Role,
    ) -> Result<StatusTransition, LifecycleError> {
        let from = self.status;
        self.status = authorize(role, from, to)?;
        Ok(StatusTransition {
            item_id: self.id.clone(),
            from,
            to,
            role,
            transitioned_at: Utc::now(),
        })
    }
}
