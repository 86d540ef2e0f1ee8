//! Classification axes and derivation rules
//!
//! Two orthogonal axes classify clinical content:
//! - **Heat**: severity. Mindblocks carry RED/AMBER/GREEN, NaviCues carry a
//!   heat level (high/medium/low) derived from the registry's tier label.
//! - **KBE stage**: readiness progression Knowing → Believing → Embodying.
//!
//! All functions here are pure and total over their documented inputs.
//! Anything outside the known vocabulary is reported, never defaulted, with
//! the single explicit exception of the batch fallback (see [`BatchPolicy`]).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::UnknownTierError;
use crate::lifecycle::Status;

/// Mindblock severity
///
/// RED (crisis) > AMBER (activated) > GREEN (calm)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Heat {
    Red,
    Amber,
    Green,
}

impl Heat {
    pub const ALL: [Heat; 3] = [Heat::Red, Heat::Amber, Heat::Green];

    /// Severity rank, higher is more severe
    pub fn severity(self) -> u8 {
        match self {
            Heat::Red => 3,
            Heat::Amber => 2,
            Heat::Green => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Heat::Red => "RED",
            Heat::Amber => "AMBER",
            Heat::Green => "GREEN",
        }
    }
}

impl fmt::Display for Heat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// NaviCue heat level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeatLevel {
    High,
    Medium,
    Low,
}

impl HeatLevel {
    pub const ALL: [HeatLevel; 3] = [HeatLevel::High, HeatLevel::Medium, HeatLevel::Low];

    /// Severity rank, higher is more severe
    pub fn severity(self) -> u8 {
        match self {
            HeatLevel::High => 3,
            HeatLevel::Medium => 2,
            HeatLevel::Low => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HeatLevel::High => "high",
            HeatLevel::Medium => "medium",
            HeatLevel::Low => "low",
        }
    }
}

impl fmt::Display for HeatLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Readiness stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KbeStage {
    Knowing,
    Believing,
    Embodying,
}

impl KbeStage {
    pub const ALL: [KbeStage; 3] = [KbeStage::Knowing, KbeStage::Believing, KbeStage::Embodying];

    pub fn as_str(self) -> &'static str {
        match self {
            KbeStage::Knowing => "Knowing",
            KbeStage::Believing => "Believing",
            KbeStage::Embodying => "Embodying",
        }
    }
}

impl fmt::Display for KbeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a registry tier label to a heat level
///
/// hot → high, warm → medium, cool → low. Labels are matched exactly.
pub fn heat_from_tier(tier: &str) -> Result<HeatLevel, UnknownTierError> {
    match tier {
        "hot" => Ok(HeatLevel::High),
        "warm" => Ok(HeatLevel::Medium),
        "cool" => Ok(HeatLevel::Low),
        other => Err(UnknownTierError {
            tier: other.to_string(),
        }),
    }
}

/// Recognize a KBE stage from any of the layer vocabularies found in source data
///
/// Accepts `Knowing|Believing|Embodying`, `K|B|E` and `learn|believe|live`,
/// case-insensitively. Returns `None` for anything else; callers keep the raw
/// label either way.
pub fn kbe_stage_from_layer(layer: &str) -> Option<KbeStage> {
    match layer.trim().to_ascii_lowercase().as_str() {
        "knowing" | "k" | "learn" => Some(KbeStage::Knowing),
        "believing" | "b" | "believe" => Some(KbeStage::Believing),
        "embodying" | "e" | "live" => Some(KbeStage::Embodying),
        _ => None,
    }
}

/// Map a source status label to a lifecycle status
///
/// The versioned registry reports `active`/`archived` where the catalog speaks
/// of published/deprecated.
pub fn status_from_label(label: &str) -> Option<Status> {
    match label {
        "draft" => Some(Status::Draft),
        "review" => Some(Status::Review),
        "published" | "active" => Some(Status::Published),
        "deprecated" | "archived" => Some(Status::Deprecated),
        _ => None,
    }
}

/// Tag marker that assigns a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchMarker {
    pub tag: String,
    pub batch: u32,
}

impl BatchMarker {
    pub fn new(tag: impl Into<String>, batch: u32) -> Self {
        Self {
            tag: tag.into(),
            batch,
        }
    }
}

/// Batch inference policy
///
/// Markers are checked in list order and the first one present in the tag set
/// wins. When no marker matches the item falls back to `default_batch`. That
/// fallback is silent at the item level and shows up in batch faceting, so it
/// stays explicit here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchPolicy {
    pub markers: Vec<BatchMarker>,
    pub default_batch: u32,
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self {
            markers: vec![
                BatchMarker::new("batch_2", 2),
                BatchMarker::new("batch_3", 3),
                BatchMarker::new("batch_4", 4),
            ],
            default_batch: 1,
        }
    }
}

impl BatchPolicy {
    /// Batch for a tag set
    pub fn batch_for<S: AsRef<str>>(&self, tags: &[S]) -> u32 {
        self.markers
            .iter()
            .find(|marker| tags.iter().any(|t| t.as_ref() == marker.tag))
            .map(|marker| marker.batch)
            .unwrap_or(self.default_batch)
    }
}

/// Batch for a tag set under the default policy
///
/// `batch_2` is checked before `batch_3` before `batch_4`; no marker → 1.
pub fn batch_from_tags<S: AsRef<str>>(tags: &[S]) -> u32 {
    BatchPolicy::default().batch_for(tags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heat_from_tier_known_labels() {
        assert_eq!(heat_from_tier("hot"), Ok(HeatLevel::High));
        assert_eq!(heat_from_tier("warm"), Ok(HeatLevel::Medium));
        assert_eq!(heat_from_tier("cool"), Ok(HeatLevel::Low));
    }

    #[test]
    fn test_heat_from_tier_rejects_everything_else() {
        for tier in ["", "HOT", "cold", "lukewarm", " hot"] {
            let err = heat_from_tier(tier).unwrap_err();
            assert_eq!(err.tier, tier, "tier {:?} should be reported verbatim", tier);
        }
    }

    #[test]
    fn test_batch_from_tags_defaults_to_one() {
        let none: [&str; 0] = [];
        assert_eq!(batch_from_tags(&none), 1);
        assert_eq!(batch_from_tags(&["legacy", "normalized"]), 1);
        assert_eq!(batch_from_tags(&["batch_5"]), 1, "unknown markers fall back");
    }

    #[test]
    fn test_batch_from_tags_priority_order() {
        assert_eq!(batch_from_tags(&["batch_4"]), 4);
        assert_eq!(batch_from_tags(&["batch_3", "batch_2"]), 2);
        assert_eq!(batch_from_tags(&["batch_4", "batch_3"]), 3);
        assert_eq!(batch_from_tags(&["x", "batch_4", "batch_2", "batch_3"]), 2);
    }

    #[test]
    fn test_custom_batch_policy() {
        let policy = BatchPolicy {
            markers: vec![BatchMarker::new("cohort_b", 7)],
            default_batch: 3,
        };
        assert_eq!(policy.batch_for(&["cohort_b"]), 7);
        assert_eq!(policy.batch_for(&["batch_2"]), 3);
    }

    #[test]
    fn test_kbe_stage_vocabularies() {
        assert_eq!(kbe_stage_from_layer("Knowing"), Some(KbeStage::Knowing));
        assert_eq!(kbe_stage_from_layer("B"), Some(KbeStage::Believing));
        assert_eq!(kbe_stage_from_layer("live"), Some(KbeStage::Embodying));
        assert_eq!(kbe_stage_from_layer("LEARN"), Some(KbeStage::Knowing));
        assert_eq!(kbe_stage_from_layer("integrate"), None);
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(status_from_label("active"), Some(Status::Published));
        assert_eq!(status_from_label("archived"), Some(Status::Deprecated));
        assert_eq!(status_from_label("review"), Some(Status::Review));
        assert_eq!(status_from_label("Draft"), None);
    }

    #[test]
    fn test_heat_serde_names() {
        assert_eq!(serde_json::to_string(&Heat::Amber).unwrap(), "\"AMBER\"");
        assert_eq!(serde_json::to_string(&HeatLevel::Medium).unwrap(), "\"medium\"");
        assert_eq!(serde_json::to_string(&KbeStage::Embodying).unwrap(), "\"Embodying\"");
        assert!(Heat::Red.severity() > Heat::Amber.severity());
    }
}
