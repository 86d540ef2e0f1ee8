//! Raw source record shapes
//!
//! Source collections mix two shapes:
//! - **Legacy**: flat NaviCue arrays (text, labels and heat given directly).
//! - **Versioned**: registry list items carrying `primary_targets` and
//!   `variant_summary` arrays, with heat expressed as a tier.
//!
//! The shape is sniffed from the record itself; callers never say which one
//! they are passing.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::classification::HeatLevel;
use crate::error::NormalizationErrorKind;
use crate::item::SourceShape;

/// Copy block of a variant (or of a legacy record)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VariantCopy {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

impl VariantCopy {
    /// First non-empty of prompt, headline, body
    pub fn primary_text(&self) -> Option<&str> {
        [&self.prompt, &self.headline, &self.body]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .find(|text| !text.trim().is_empty())
    }
}

/// Entry of a versioned record's `variant_summary`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariantSummary {
    pub lens: Option<String>,
    pub copy: Option<VariantCopy>,
}

impl VariantSummary {
    /// Read a variant entry field by field
    ///
    /// A non-object entry, or a `copy` block that does not read as copy, is a
    /// variant without copy rather than a malformed record.
    pub fn from_value(value: &Value) -> Self {
        Self {
            lens: value.get("lens").and_then(Value::as_str).map(str::to_string),
            copy: value
                .get("copy")
                .and_then(|copy| VariantCopy::deserialize(copy).ok()),
        }
    }
}

/// Entry of a versioned record's `primary_targets`
#[derive(Debug, Clone, Deserialize)]
pub struct RawTarget {
    pub scope_type: String,
    #[serde(default)]
    pub scope_id: Option<String>,
    #[serde(default)]
    pub schema_id: Option<String>,
    #[serde(default)]
    pub family_id: Option<String>,
    #[serde(default)]
    pub mindblock_id: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

impl RawTarget {
    /// Read a target entry; entries without a usable `scope_type` are skipped
    pub fn from_value(value: &Value) -> Option<Self> {
        match RawTarget::deserialize(value) {
            Ok(target) => Some(target),
            Err(e) => {
                debug!(error = %e, "Skipping unreadable primary target");
                None
            }
        }
    }

    /// Id of the node this target points at
    ///
    /// `scope_id` wins; otherwise the id column matching the scope type.
    pub fn target_id(&self) -> Option<&str> {
        self.scope_id
            .as_deref()
            .or(match self.scope_type.as_str() {
                "schema" => self.schema_id.as_deref(),
                "family" => self.family_id.as_deref(),
                "mindblock" => self.mindblock_id.as_deref(),
                _ => None,
            })
    }
}

/// Registry list item
#[derive(Debug, Clone, Deserialize)]
pub struct VersionedRecord {
    pub id: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub kbe_layer: Option<String>,
    #[serde(default)]
    pub tier: Option<String>,
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub default_response_type: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub created_at: Option<String>,
    /// Read entry by entry, see [`VersionedRecord::targets`]
    pub primary_targets: Vec<Value>,
    /// Read entry by entry, see [`VersionedRecord::first_variant`]
    pub variant_summary: Vec<Value>,
    #[serde(default)]
    pub exposures_count: Option<u64>,
    #[serde(default)]
    pub completions_count: Option<u64>,
    #[serde(default)]
    pub avg_effectiveness: Option<f64>,
}

impl VersionedRecord {
    /// Readable primary targets in source order
    pub fn targets(&self) -> Vec<RawTarget> {
        self.primary_targets
            .iter()
            .filter_map(RawTarget::from_value)
            .collect()
    }

    pub fn first_variant(&self) -> Option<VariantSummary> {
        self.variant_summary.first().map(VariantSummary::from_value)
    }
}

/// Flat legacy NaviCue
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyRecord {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub text_line: Option<String>,
    #[serde(default)]
    pub copy: Option<VariantCopy>,
    #[serde(default)]
    pub pillar_id: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub schema_id: Option<String>,
    #[serde(default)]
    pub family_id: Option<String>,
    #[serde(default)]
    pub mindblock_id: Option<String>,
    #[serde(default)]
    pub kbe_layer: Option<String>,
    #[serde(default)]
    pub response_type: Option<String>,
    #[serde(default)]
    pub heat_level: Option<HeatLevel>,
    #[serde(default)]
    pub council_lens: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub batch: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub exposures_count: Option<u64>,
    #[serde(default)]
    pub completions_count: Option<u64>,
    #[serde(default)]
    pub avg_effectiveness: Option<f64>,
}

/// A raw record after shape sniffing
#[derive(Debug, Clone)]
pub enum RawRecord {
    Legacy(LegacyRecord),
    Versioned(VersionedRecord),
}

impl RawRecord {
    /// Decide the shape of a raw value
    ///
    /// Both `primary_targets` and `variant_summary` arrays ⇒ versioned;
    /// anything else is treated as legacy.
    pub fn sniff(value: &Value) -> SourceShape {
        let is_array = |field: &str| value.get(field).map(Value::is_array).unwrap_or(false);
        if is_array("primary_targets") && is_array("variant_summary") {
            SourceShape::Versioned
        } else {
            SourceShape::Legacy
        }
    }

    /// Parse a raw value into its sniffed shape
    pub fn parse(value: &Value) -> Result<Self, NormalizationErrorKind> {
        let object = value.as_object().ok_or_else(|| {
            NormalizationErrorKind::Malformed(format!(
                "expected a JSON object, found {}",
                json_kind(value)
            ))
        })?;

        match object.get("id") {
            Some(Value::String(id)) if !id.trim().is_empty() => {}
            Some(Value::String(_)) | None | Some(Value::Null) => {
                return Err(NormalizationErrorKind::MissingField("id".to_string()));
            }
            Some(other) => {
                return Err(NormalizationErrorKind::Malformed(format!(
                    "id must be a string, found {}",
                    json_kind(other)
                )));
            }
        }

        let parsed = match Self::sniff(value) {
            SourceShape::Versioned => VersionedRecord::deserialize(value).map(RawRecord::Versioned),
            SourceShape::Legacy => LegacyRecord::deserialize(value).map(RawRecord::Legacy),
        };
        parsed.map_err(|e| NormalizationErrorKind::Malformed(e.to_string()))
    }

    pub fn shape(&self) -> SourceShape {
        match self {
            RawRecord::Legacy(_) => SourceShape::Legacy,
            RawRecord::Versioned(_) => SourceShape::Versioned,
        }
    }
}

/// Best-effort id for error reports on records that failed to parse
pub fn peek_id(value: &Value) -> Option<String> {
    value
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.trim().is_empty())
        .map(str::to_string)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
