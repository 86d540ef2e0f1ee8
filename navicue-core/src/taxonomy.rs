//! Clinical taxonomy: Schema → Family → Mindblock
//!
//! Reference data authored outside the core. A [`Taxonomy`] is only handed out
//! after every family resolves to a schema and every mindblock resolves to a
//! family; authoring mistakes surface as [`IntegrityError`] at construction
//! instead of as silently missing branches at query time.
//!
//! Keys are case-sensitive and compared by exact string equality.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

use crate::classification::{Heat, KbeStage};
use crate::error::{IntegrityError, IntegrityErrorKind};

/// Top-level clinical domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(alias = "schema_key")]
    pub key: String,
    pub title: String,
    /// Accent color for display (e.g. "#E85D75")
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Pillar this schema rolls up to
    #[serde(default)]
    pub pillar_id: Option<String>,
}

/// Grouping of mindblocks within a schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Family {
    #[serde(alias = "family_key")]
    pub key: String,
    pub schema_key: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub archetype: Option<String>,
}

/// Atomic clinical belief unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mindblock {
    #[serde(alias = "mindblock_key")]
    pub key: String,
    pub family_key: String,
    /// The belief as the person holds it
    pub limiting_prediction: String,
    /// The reframe
    pub truth: String,
    pub heat: Heat,
    pub kbe_stage: KbeStage,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Plain taxonomy document as supplied by the authoring process
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyRecords {
    #[serde(default)]
    pub schemas: Vec<Schema>,
    #[serde(default)]
    pub families: Vec<Family>,
    #[serde(default)]
    pub mindblocks: Vec<Mindblock>,
}

/// Validated, indexed taxonomy
#[derive(Debug, Clone, Default)]
pub struct Taxonomy {
    schemas: Vec<Schema>,
    families: Vec<Family>,
    mindblocks: Vec<Mindblock>,
    schema_index: HashMap<String, usize>,
    family_index: HashMap<String, usize>,
    mindblock_index: HashMap<String, usize>,
    families_by_schema: HashMap<String, Vec<usize>>,
    mindblocks_by_family: HashMap<String, Vec<usize>>,
}

impl Taxonomy {
    /// Build a taxonomy, checking key uniqueness and referential integrity
    ///
    /// Family keys are unique across the whole taxonomy, not only within
    /// their schema; the same holds for schema and mindblock keys.
    ///
    /// The first violation found is returned; schemas are checked before
    /// families, families before mindblocks, each in input order.
    pub fn build(
        schemas: Vec<Schema>,
        families: Vec<Family>,
        mindblocks: Vec<Mindblock>,
    ) -> Result<Self, IntegrityError> {
        let mut schema_index = HashMap::with_capacity(schemas.len());
        for (i, schema) in schemas.iter().enumerate() {
            if schema_index.insert(schema.key.clone(), i).is_some() {
                return Err(IntegrityError::new(
                    IntegrityErrorKind::DuplicateSchema,
                    &schema.key,
                ));
            }
        }

        let mut family_index = HashMap::with_capacity(families.len());
        let mut families_by_schema: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, family) in families.iter().enumerate() {
            if !schema_index.contains_key(&family.schema_key) {
                return Err(IntegrityError::new(
                    IntegrityErrorKind::OrphanedFamily,
                    &family.key,
                ));
            }
            if family_index.insert(family.key.clone(), i).is_some() {
                return Err(IntegrityError::new(
                    IntegrityErrorKind::DuplicateFamily,
                    &family.key,
                ));
            }
            families_by_schema
                .entry(family.schema_key.clone())
                .or_default()
                .push(i);
        }

        let mut mindblock_index = HashMap::with_capacity(mindblocks.len());
        let mut mindblocks_by_family: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, mindblock) in mindblocks.iter().enumerate() {
            if !family_index.contains_key(&mindblock.family_key) {
                return Err(IntegrityError::new(
                    IntegrityErrorKind::OrphanedMindblock,
                    &mindblock.key,
                ));
            }
            if mindblock_index.insert(mindblock.key.clone(), i).is_some() {
                return Err(IntegrityError::new(
                    IntegrityErrorKind::DuplicateMindblock,
                    &mindblock.key,
                ));
            }
            mindblocks_by_family
                .entry(mindblock.family_key.clone())
                .or_default()
                .push(i);
        }

        info!(
            schemas = schemas.len(),
            families = families.len(),
            mindblocks = mindblocks.len(),
            "Taxonomy built"
        );

        Ok(Self {
            schemas,
            families,
            mindblocks,
            schema_index,
            family_index,
            mindblock_index,
            families_by_schema,
            mindblocks_by_family,
        })
    }

    /// Build from a plain taxonomy document
    pub fn from_records(records: TaxonomyRecords) -> Result<Self, IntegrityError> {
        Self::build(records.schemas, records.families, records.mindblocks)
    }

    /// Taxonomy with no nodes; every target resolves as unmapped
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn resolve_schema(&self, key: &str) -> Option<&Schema> {
        self.schema_index.get(key).map(|&i| &self.schemas[i])
    }

    pub fn resolve_family(&self, key: &str) -> Option<&Family> {
        self.family_index.get(key).map(|&i| &self.families[i])
    }

    pub fn resolve_mindblock(&self, key: &str) -> Option<&Mindblock> {
        self.mindblock_index.get(key).map(|&i| &self.mindblocks[i])
    }

    /// Families of a schema in authoring order (empty for unknown keys)
    pub fn families_of(&self, schema_key: &str) -> Vec<&Family> {
        self.families_by_schema
            .get(schema_key)
            .map(|ids| ids.iter().map(|&i| &self.families[i]).collect())
            .unwrap_or_default()
    }

    /// Mindblocks of a family in authoring order (empty for unknown keys)
    pub fn mindblocks_of(&self, family_key: &str) -> Vec<&Mindblock> {
        self.mindblocks_by_family
            .get(family_key)
            .map(|ids| ids.iter().map(|&i| &self.mindblocks[i]).collect())
            .unwrap_or_default()
    }

    /// Parent schema of a family
    pub fn schema_of_family(&self, family_key: &str) -> Option<&Schema> {
        self.resolve_family(family_key)
            .and_then(|family| self.resolve_schema(&family.schema_key))
    }

    /// Parent family of a mindblock
    pub fn family_of_mindblock(&self, mindblock_key: &str) -> Option<&Family> {
        self.resolve_mindblock(mindblock_key)
            .and_then(|mindblock| self.resolve_family(&mindblock.family_key))
    }

    pub fn schemas(&self) -> &[Schema] {
        &self.schemas
    }

    pub fn families(&self) -> &[Family] {
        &self.families
    }

    pub fn mindblocks(&self) -> &[Mindblock] {
        &self.mindblocks
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
