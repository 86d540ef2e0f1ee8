//! Error types for the NaviCue catalog core
//!
//! Typed errors surfaced to the presentation layer (`IntegrityError`,
//! `UnknownTierError`, `NormalizationError`, `InvalidTransitionError`,
//! `LifecycleError`) derive `Serialize` so they can be rendered directly.
//! The crate-level [`Error`] wraps them together with I/O and parsing failures
//! for the few operations that touch the outside world (config loading).

use serde::Serialize;
use thiserror::Error;

use crate::lifecycle::{Role, Status};

/// Common result type for catalog operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type across the catalog core
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON document could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML document could not be parsed
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Taxonomy failed referential integrity checks
    #[error("Taxonomy integrity error: {0}")]
    Integrity(#[from] IntegrityError),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Kind of referential integrity violation found while building a taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityErrorKind {
    /// Family references a schema key that does not exist
    OrphanedFamily,
    /// Mindblock references a family key that does not exist
    OrphanedMindblock,
    /// Two schemas share a key
    DuplicateSchema,
    /// Two families share a key
    DuplicateFamily,
    /// Two mindblocks share a key
    DuplicateMindblock,
}

/// Taxonomy construction failure
///
/// Fatal to the taxonomy instance being built: an inconsistent taxonomy is
/// never handed out for resolution.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{kind:?} for key '{key}'")]
pub struct IntegrityError {
    pub kind: IntegrityErrorKind,
    /// Key of the offending record (the family or mindblock key for orphans)
    pub key: String,
}

impl IntegrityError {
    pub fn new(kind: IntegrityErrorKind, key: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into(),
        }
    }
}

/// Tier label outside hot/warm/cool
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("Unknown tier '{tier}' (expected hot, warm or cool)")]
pub struct UnknownTierError {
    pub tier: String,
}

/// Why a single raw record could not be normalized
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum NormalizationErrorKind {
    /// Record is not a JSON object or does not match its sniffed shape
    #[error("malformed record: {0}")]
    Malformed(String),

    /// A field the shape requires is absent
    #[error("missing required field '{0}'")]
    MissingField(String),

    /// Versioned tier could not be classified
    #[error("{0}")]
    UnknownTier(UnknownTierError),

    /// Status label is not a known lifecycle status
    #[error("unknown status '{0}'")]
    UnknownStatus(String),

    /// Batch must be a positive integer
    #[error("invalid batch {0} (must be positive)")]
    InvalidBatch(i64),

    /// created_at is not an RFC 3339 timestamp
    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    /// Another record in the same batch already used this id
    #[error("duplicate id '{0}'")]
    DuplicateId(String),
}

/// Per-record normalization failure
///
/// Non-fatal to the batch: collected into a side list while the remaining
/// records are still normalized.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("record #{}{}: {}", .index, id_suffix(.record_id), .kind)]
pub struct NormalizationError {
    /// Position of the record in the source collection
    pub index: usize,
    /// Record id when it could be read from the raw record
    pub record_id: Option<String>,
    pub kind: NormalizationErrorKind,
}

fn id_suffix(record_id: &Option<String>) -> String {
    match record_id {
        Some(id) => format!(" ({})", id),
        None => String::new(),
    }
}

impl From<UnknownTierError> for NormalizationErrorKind {
    fn from(err: UnknownTierError) -> Self {
        NormalizationErrorKind::UnknownTier(err)
    }
}

/// Lifecycle transition that the state machine does not allow
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[error("{}", transition_message(*.from, *.to))]
pub struct InvalidTransitionError {
    pub from: Status,
    pub to: Status,
}

fn transition_message(from: Status, to: Status) -> String {
    match (from, to) {
        (Status::Draft, Status::Published) => {
            "cannot publish a draft directly; send it to review first".to_string()
        }
        (Status::Deprecated, _) => {
            format!("'{}' items are retired and cannot move to '{}'", from, to)
        }
        _ if from == to => format!("item is already '{}'", from),
        _ => format!("cannot move an item from '{}' to '{}'", from, to),
    }
}

/// Lifecycle failure for a role-checked transition
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LifecycleError {
    /// Transition is never allowed
    #[error(transparent)]
    Invalid(#[from] InvalidTransitionError),

    /// Transition is allowed, but not for this role
    #[error("{role} may not move an item from '{from}' to '{to}'")]
    Unauthorized { role: Role, from: Status, to: Status },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization_error_display_includes_record_id() {
        let err = NormalizationError {
            index: 4,
            record_id: Some("nc-0004".to_string()),
            kind: NormalizationErrorKind::MissingField("tier".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "record #4 (nc-0004): missing required field 'tier'"
        );

        let anonymous = NormalizationError {
            index: 7,
            record_id: None,
            kind: NormalizationErrorKind::Malformed("expected object".to_string()),
        };
        assert_eq!(anonymous.to_string(), "record #7: malformed record: expected object");
    }

    #[test]
    fn test_invalid_transition_message_for_direct_publish() {
        let err = InvalidTransitionError {
            from: Status::Draft,
            to: Status::Published,
        };
        assert!(err.to_string().contains("send it to review first"));
    }

    #[test]
    fn test_typed_errors_serialize() {
        let err = IntegrityError::new(IntegrityErrorKind::OrphanedFamily, "fam.lonely");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "orphaned_family");
        assert_eq!(json["key"], "fam.lonely");

        let tier = NormalizationErrorKind::from(UnknownTierError {
            tier: "scalding".to_string(),
        });
        let json = serde_json::to_value(&tier).unwrap();
        assert_eq!(json["kind"], "unknown_tier");
        assert_eq!(json["detail"]["tier"], "scalding");
    }
}
