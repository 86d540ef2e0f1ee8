//! Item normalizer
//!
//! Translates raw source records into canonical [`ContentItem`]s anchored to
//! the taxonomy. Favors availability over strictness: missing copy or
//! unresolvable targets degrade to the `NO_COPY` / `UNMAPPED` sentinels, and a
//! record that cannot be translated at all becomes a [`NormalizationError`] in
//! a side list instead of aborting the rest of the collection.
//!
//! The taxonomy is only read, never modified.

pub mod records;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info, warn};

use crate::classification::{heat_from_tier, kbe_stage_from_layer, status_from_label, BatchPolicy};
use crate::error::{NormalizationError, NormalizationErrorKind};
use crate::item::{ContentItem, PrimaryTarget, ScopeType, SourceShape, NO_COPY, UNMAPPED};
use crate::lifecycle::Status;
use crate::taxonomy::Taxonomy;

use records::{LegacyRecord, RawRecord, RawTarget, VersionedRecord};

/// Outcome of normalizing a collection
#[derive(Debug, Clone, Default, Serialize)]
pub struct NormalizedBatch {
    /// Successfully normalized items in source order
    pub items: Vec<ContentItem>,
    /// Records that could not be normalized
    pub errors: Vec<NormalizationError>,
}

impl NormalizedBatch {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Normalizer bound to a taxonomy and a batch policy
#[derive(Debug, Clone)]
pub struct Normalizer<'a> {
    taxonomy: &'a Taxonomy,
    batch_policy: BatchPolicy,
}

impl<'a> Normalizer<'a> {
    /// Normalizer with the default batch policy
    pub fn new(taxonomy: &'a Taxonomy) -> Self {
        Self {
            taxonomy,
            batch_policy: BatchPolicy::default(),
        }
    }

    pub fn with_batch_policy(mut self, policy: BatchPolicy) -> Self {
        self.batch_policy = policy;
        self
    }

    /// Normalize a single record
    ///
    /// `index` is the record's position in its source collection and is only
    /// used for error reporting.
    pub fn normalize(&self, index: usize, raw: &Value) -> Result<ContentItem, NormalizationError> {
        let fail = |kind| NormalizationError {
            index,
            record_id: records::peek_id(raw),
            kind,
        };

        let record = RawRecord::parse(raw).map_err(fail)?;
        let item = match record {
            RawRecord::Versioned(v) => self.from_versioned(v),
            RawRecord::Legacy(l) => self.from_legacy(l),
        };
        item.map_err(fail)
    }

    /// Normalize a whole collection, collecting per-record failures
    ///
    /// A later record reusing an earlier record's id is reported as a
    /// duplicate; the first occurrence is kept.
    pub fn normalize_all(&self, raws: &[Value]) -> NormalizedBatch {
        let mut batch = NormalizedBatch::default();
        let mut seen_ids = HashSet::with_capacity(raws.len());
        let mut versioned = 0usize;

        for (index, raw) in raws.iter().enumerate() {
            let result = self.normalize(index, raw).and_then(|item| {
                if seen_ids.insert(item.id.clone()) {
                    Ok(item)
                } else {
                    Err(NormalizationError {
                        index,
                        record_id: Some(item.id.clone()),
                        kind: NormalizationErrorKind::DuplicateId(item.id),
                    })
                }
            });

            match result {
                Ok(item) => {
                    if item.source_shape == SourceShape::Versioned {
                        versioned += 1;
                    }
                    batch.items.push(item);
                }
                Err(err) => {
                    warn!(index = err.index, record_id = ?err.record_id, "Skipping record: {}", err.kind);
                    batch.errors.push(err);
                }
            }
        }

        info!(
            records = raws.len(),
            items = batch.items.len(),
            versioned,
            legacy = batch.items.len() - versioned,
            errors = batch.errors.len(),
            "Normalization complete"
        );

        batch
    }

    fn from_versioned(&self, record: VersionedRecord) -> Result<ContentItem, NormalizationErrorKind> {
        let tier = record
            .tier
            .as_deref()
            .ok_or_else(|| NormalizationErrorKind::MissingField("tier".to_string()))?;
        let heat_level = heat_from_tier(tier)?;
        let status = parse_status(record.status.as_deref())?;
        let created_at = parse_timestamp(record.created_at.as_deref())?;

        let targets = self.resolve_targets(&record.targets());

        let first_variant = record.first_variant();
        let text = first_variant
            .as_ref()
            .and_then(|v| v.copy.as_ref())
            .and_then(|copy| copy.primary_text())
            .map(str::to_string);

        let schema_target = targets.iter().find(|t| t.scope_type == ScopeType::Schema);
        let schema = schema_target
            .map(target_facet_label)
            .unwrap_or_else(|| UNMAPPED.to_string());
        let family = record
            .family
            .clone()
            .filter(|f| !f.trim().is_empty())
            .or_else(|| {
                targets
                    .iter()
                    .find(|t| t.scope_type == ScopeType::Family)
                    .map(target_facet_label)
            })
            .unwrap_or_else(|| UNMAPPED.to_string());
        let pillar = schema_target
            .filter(|t| t.resolved)
            .and_then(|t| self.taxonomy.resolve_schema(&t.scope_id))
            .and_then(|s| s.pillar_id.clone())
            .unwrap_or_else(|| UNMAPPED.to_string());

        let tags = record.tags.unwrap_or_default();
        let batch = self.batch_policy.batch_for(tags.as_slice());

        let (text_line, missing_copy) = match text {
            Some(text) => (text, false),
            None => {
                debug!(id = %record.id, "Versioned record has no copy");
                (NO_COPY.to_string(), true)
            }
        };

        Ok(ContentItem {
            name: record.code.clone().unwrap_or_else(|| record.id.clone()),
            id: record.id,
            text_line,
            missing_copy,
            status,
            batch,
            tags: tags.into_iter().collect(),
            targets,
            schema,
            family,
            pillar,
            heat_level: Some(heat_level),
            kbe_stage: record.kbe_layer.as_deref().and_then(kbe_stage_from_layer),
            kbe_layer: record.kbe_layer,
            response_type: record.default_response_type,
            council_lens: first_variant.and_then(|v| v.lens),
            source_shape: SourceShape::Versioned,
            created_at,
            exposures_count: record.exposures_count,
            completions_count: record.completions_count,
            avg_effectiveness: record.avg_effectiveness,
        })
    }

    fn from_legacy(&self, record: LegacyRecord) -> Result<ContentItem, NormalizationErrorKind> {
        let status = parse_status(record.status.as_deref())?;
        let created_at = parse_timestamp(record.created_at.as_deref())?;
        let batch = match record.batch {
            None => 1,
            Some(b) if b > 0 && b <= i64::from(u32::MAX) => b as u32,
            Some(b) => return Err(NormalizationErrorKind::InvalidBatch(b)),
        };

        let mut targets = Vec::new();
        for (scope_type, id) in [
            (ScopeType::Schema, &record.schema_id),
            (ScopeType::Family, &record.family_id),
            (ScopeType::Mindblock, &record.mindblock_id),
        ] {
            if let Some(id) = id.as_deref().filter(|id| !id.trim().is_empty()) {
                targets.push(self.resolve_target(scope_type, id, None));
            }
        }

        let given = |field: &Option<String>| field.clone().filter(|v| !v.trim().is_empty());
        let target_label = |scope: ScopeType| {
            targets
                .iter()
                .find(|t| t.scope_type == scope && t.resolved)
                .and_then(|t| t.label.clone())
        };

        let schema = given(&record.schema)
            .or_else(|| target_label(ScopeType::Schema))
            .unwrap_or_else(|| UNMAPPED.to_string());
        let family = given(&record.family)
            .or_else(|| target_label(ScopeType::Family))
            .unwrap_or_else(|| UNMAPPED.to_string());
        let pillar = given(&record.pillar_id)
            .or_else(|| {
                record
                    .schema_id
                    .as_deref()
                    .and_then(|key| self.taxonomy.resolve_schema(key))
                    .and_then(|s| s.pillar_id.clone())
            })
            .unwrap_or_else(|| UNMAPPED.to_string());

        let text = given(&record.text_line).or_else(|| {
            record
                .copy
                .as_ref()
                .and_then(|copy| copy.primary_text())
                .map(str::to_string)
        });
        let (text_line, missing_copy) = match text {
            Some(text) => (text, false),
            None => (NO_COPY.to_string(), true),
        };

        let name = given(&record.name)
            .or_else(|| given(&record.code))
            .unwrap_or_else(|| record.id.clone());

        Ok(ContentItem {
            id: record.id,
            name,
            text_line,
            missing_copy,
            status,
            batch,
            tags: record.tags.unwrap_or_default().into_iter().collect::<BTreeSet<_>>(),
            targets,
            schema,
            family,
            pillar,
            heat_level: record.heat_level,
            kbe_stage: record.kbe_layer.as_deref().and_then(kbe_stage_from_layer),
            kbe_layer: record.kbe_layer,
            response_type: record.response_type,
            council_lens: record.council_lens,
            source_shape: SourceShape::Legacy,
            created_at,
            exposures_count: record.exposures_count,
            completions_count: record.completions_count,
            avg_effectiveness: record.avg_effectiveness,
        })
    }

    fn resolve_targets(&self, raw: &[RawTarget]) -> Vec<PrimaryTarget> {
        raw.iter()
            .filter_map(|target| match ScopeType::from_label(&target.scope_type) {
                Some(scope_type) => Some(self.resolve_target(
                    scope_type,
                    target.target_id().unwrap_or_default(),
                    target.label.clone(),
                )),
                None => {
                    debug!(scope_type = %target.scope_type, "Ignoring target outside the taxonomy");
                    None
                }
            })
            .collect()
    }

    fn resolve_target(&self, scope_type: ScopeType, id: &str, label: Option<String>) -> PrimaryTarget {
        let title = match scope_type {
            ScopeType::Schema => self.taxonomy.resolve_schema(id).map(|s| s.title.clone()),
            ScopeType::Family => self.taxonomy.resolve_family(id).map(|f| f.title.clone()),
            ScopeType::Mindblock => self.taxonomy.resolve_mindblock(id).map(|m| m.key.clone()),
        };
        let resolved = title.is_some();
        PrimaryTarget {
            scope_type,
            scope_id: id.to_string(),
            label: label.filter(|l| !l.trim().is_empty()).or(title),
            resolved,
        }
    }
}

/// Normalize one record against a taxonomy with the default batch policy
pub fn normalize(raw: &Value, taxonomy: &Taxonomy) -> Result<ContentItem, NormalizationError> {
    Normalizer::new(taxonomy).normalize(0, raw)
}

/// Normalize a collection against a taxonomy with the given batch policy
pub fn normalize_all(raws: &[Value], taxonomy: &Taxonomy, policy: &BatchPolicy) -> NormalizedBatch {
    Normalizer::new(taxonomy)
        .with_batch_policy(policy.clone())
        .normalize_all(raws)
}

/// Facet label of a target: its label, else its raw id, else `UNMAPPED`
fn target_facet_label(target: &PrimaryTarget) -> String {
    target
        .label
        .clone()
        .or_else(|| Some(target.scope_id.clone()).filter(|id| !id.is_empty()))
        .unwrap_or_else(|| UNMAPPED.to_string())
}

fn parse_status(label: Option<&str>) -> Result<Status, NormalizationErrorKind> {
    match label {
        None => Ok(Status::default()),
        Some(label) => status_from_label(label)
            .ok_or_else(|| NormalizationErrorKind::UnknownStatus(label.to_string())),
    }
}

fn parse_timestamp(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, NormalizationErrorKind> {
    raw.map(|s| {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| NormalizationErrorKind::InvalidTimestamp(s.to_string()))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::{HeatLevel, KbeStage};
    use crate::taxonomy::tests::sample_taxonomy;
    use serde_json::json;

    fn versioned(id: &str) -> Value {
        json!({
            "id": id,
            "code": format!("nc.{}", id),
            "status": "active",
            "kbe_layer": "believe",
            "tier": "warm",
            "default_response_type": "slider_0_10",
            "tags": ["batch_3"],
            "primary_targets": [
                {"scope_type": "schema", "schema_id": "abandonment"},
                {"scope_type": "family", "family_id": "fam.left_behind"}
            ],
            "variant_summary": [
                {"lens": "watts", "copy": {"headline": "Which is it?", "body": "Body"}}
            ]
        })
    }

    #[test]
    fn test_versioned_record_enriched_from_taxonomy() {
        let taxonomy = sample_taxonomy();
        let item = normalize(&versioned("v1"), &taxonomy).unwrap();

        assert_eq!(item.source_shape, SourceShape::Versioned);
        assert_eq!(item.name, "nc.v1");
        assert_eq!(item.text_line, "Which is it?");
        assert!(!item.missing_copy);
        assert_eq!(item.schema, "Abandonment");
        assert_eq!(item.family, "Left Behind");
        assert_eq!(item.pillar, "pillar.abandonment");
        assert_eq!(item.heat_level, Some(HeatLevel::Medium));
        assert_eq!(item.kbe_layer.as_deref(), Some("believe"));
        assert_eq!(item.kbe_stage, Some(KbeStage::Believing));
        assert_eq!(item.status, Status::Published);
        assert_eq!(item.batch, 3);
        assert_eq!(item.council_lens.as_deref(), Some("watts"));
        assert_eq!(item.response_type.as_deref(), Some("slider_0_10"));
        assert!(item.targets.iter().all(|t| t.resolved));
    }

    #[test]
    fn test_versioned_without_schema_target_is_unmapped() {
        let taxonomy = sample_taxonomy();
        let mut raw = versioned("v2");
        raw["primary_targets"] = json!([{"scope_type": "mindblock", "mindblock_id": "mb.001"}]);
        let item = normalize(&raw, &taxonomy).unwrap();
        assert_eq!(item.schema, UNMAPPED);
        assert_eq!(item.family, UNMAPPED);
        assert_eq!(item.pillar, UNMAPPED);
        assert!(item.is_unmapped());
    }

    #[test]
    fn test_unresolved_target_kept_with_its_own_label() {
        let taxonomy = sample_taxonomy();
        let mut raw = versioned("v3");
        raw["primary_targets"] = json!([
            {"scope_type": "schema", "schema_id": "mistrust", "label": "Mistrust"}
        ]);
        let item = normalize(&raw, &taxonomy).unwrap();
        assert_eq!(item.schema, "Mistrust");
        assert_eq!(item.pillar, UNMAPPED);
        let unmapped: Vec<_> = item.unmapped_targets().collect();
        assert_eq!(unmapped.len(), 1);
        assert_eq!(unmapped[0].scope_id, "mistrust");
    }

    #[test]
    fn test_versioned_without_copy_uses_sentinel() {
        let taxonomy = sample_taxonomy();
        let mut raw = versioned("v4");
        raw["variant_summary"] = json!([{"lens": "system", "copy": {"options": ["a"]}}]);
        let item = normalize(&raw, &taxonomy).unwrap();
        assert_eq!(item.text_line, NO_COPY);
        assert!(item.missing_copy);

        raw["variant_summary"] = json!([]);
        let item = normalize(&raw, &taxonomy).unwrap();
        assert_eq!(item.text_line, NO_COPY);
        assert_eq!(item.council_lens, None);
    }

    #[test]
    fn test_null_variant_and_scopeless_target_still_normalize() {
        let taxonomy = sample_taxonomy();
        let mut raw = versioned("v6");
        raw["variant_summary"] = json!([null]);
        raw["primary_targets"] = json!([
            {"label": "x"},
            {"scope_type": "schema", "schema_id": "abandonment"}
        ]);

        let item = normalize(&raw, &taxonomy).unwrap();
        assert_eq!(item.text_line, NO_COPY);
        assert!(item.missing_copy);
        assert_eq!(item.schema, "Abandonment");
        assert_eq!(item.targets.len(), 1);
    }

    #[test]
    fn test_versioned_tier_errors() {
        let taxonomy = sample_taxonomy();
        let mut raw = versioned("v5");
        raw["tier"] = json!("scorching");
        let err = normalize(&raw, &taxonomy).unwrap_err();
        assert_eq!(err.record_id.as_deref(), Some("v5"));
        assert!(matches!(err.kind, NormalizationErrorKind::UnknownTier(ref e) if e.tier == "scorching"));

        raw.as_object_mut().unwrap().remove("tier");
        let err = normalize(&raw, &taxonomy).unwrap_err();
        assert_eq!(err.kind, NormalizationErrorKind::MissingField("tier".to_string()));
    }

    #[test]
    fn test_legacy_record_taken_as_given() {
        let taxonomy = sample_taxonomy();
        let raw = json!({
            "id": "nc-0001",
            "name": "Mirror the fear",
            "text_line": "What if they stay?",
            "pillar_id": "P2",
            "schema": "Abandonment",
            "family": "statement_mirror",
            "kbe_layer": "K",
            "heat_level": "high",
            "tags": ["core", "core"],
            "batch": 3,
            "status": "review",
            "created_at": "2025-11-02T10:15:00Z",
            "exposures_count": 40,
            "completions_count": 10,
            "avg_effectiveness": 7.5
        });
        let item = normalize(&raw, &taxonomy).unwrap();
        assert_eq!(item.source_shape, SourceShape::Legacy);
        assert_eq!(item.name, "Mirror the fear");
        assert_eq!(item.pillar, "P2");
        assert_eq!(item.family, "statement_mirror");
        assert_eq!(item.heat_level, Some(HeatLevel::High));
        assert_eq!(item.kbe_stage, Some(KbeStage::Knowing));
        assert_eq!(item.batch, 3);
        assert_eq!(item.status, Status::Review);
        assert_eq!(item.tags.len(), 1);
        assert!(item.created_at.is_some());
        assert!(item.targets.is_empty());
    }

    #[test]
    fn test_legacy_defaults_and_target_resolution() {
        let taxonomy = sample_taxonomy();
        let raw = json!({
            "id": "nc-0002",
            "copy": {"prompt": "", "headline": "Notice the grip"},
            "schema_id": "defectiveness",
            "mindblock_id": "mb.404",
            "tags": ["batch_4"]
        });
        let item = normalize(&raw, &taxonomy).unwrap();
        assert_eq!(item.name, "nc-0002");
        assert_eq!(item.text_line, "Notice the grip");
        assert_eq!(item.batch, 1, "legacy batch comes from the batch field only");
        assert_eq!(item.status, Status::Draft);
        assert_eq!(item.schema, "Defectiveness");
        assert_eq!(item.pillar, "pillar.defectiveness");
        assert_eq!(item.family, UNMAPPED);
        assert_eq!(item.heat_level, None);
        assert_eq!(item.targets.len(), 2);
        assert_eq!(item.unmapped_targets().count(), 1);
    }

    #[test]
    fn test_legacy_rejects_non_positive_batch_and_bad_timestamp() {
        let taxonomy = Taxonomy::empty();
        let err = normalize(&json!({"id": "x", "batch": 0}), &taxonomy).unwrap_err();
        assert_eq!(err.kind, NormalizationErrorKind::InvalidBatch(0));

        let err = normalize(&json!({"id": "x", "created_at": "yesterday"}), &taxonomy).unwrap_err();
        assert_eq!(
            err.kind,
            NormalizationErrorKind::InvalidTimestamp("yesterday".to_string())
        );

        let err = normalize(&json!({"id": "x", "status": "live"}), &taxonomy).unwrap_err();
        assert_eq!(err.kind, NormalizationErrorKind::UnknownStatus("live".to_string()));
    }

    #[test]
    fn test_normalize_all_continues_past_bad_records() {
        let taxonomy = sample_taxonomy();
        let mut bad_tier = versioned("v-bad");
        bad_tier["tier"] = json!("tepid");
        let raws = vec![
            versioned("v1"),
            json!("not a record"),
            bad_tier,
            json!({"id": "legacy-1", "text_line": "hello"}),
            versioned("v1"),
        ];

        let batch = normalize_all(&raws, &taxonomy, &BatchPolicy::default());
        let ids: Vec<_> = batch.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["v1", "legacy-1"]);

        let error_indexes: Vec<_> = batch.errors.iter().map(|e| e.index).collect();
        assert_eq!(error_indexes, vec![1, 2, 4]);
        assert_eq!(
            batch.errors[2].kind,
            NormalizationErrorKind::DuplicateId("v1".to_string())
        );
        assert!(!batch.is_clean());
    }

    #[test]
    fn test_normalizer_never_mutates_taxonomy() {
        let taxonomy = sample_taxonomy();
        let before = taxonomy.schemas().to_vec();
        let _ = normalize(&versioned("v1"), &taxonomy);
        assert_eq!(taxonomy.schemas(), before.as_slice());
    }
}
