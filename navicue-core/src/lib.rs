//! # NaviCue Catalog Core
//!
//! Clinical content taxonomy and faceted classification index:
//! - Taxonomy model (Schema → Family → Mindblock) with integrity checks
//! - Classification rules (heat, KBE stage, batch, status labels)
//! - Normalizer merging legacy and versioned records into one item model
//! - Faceted index, filter/search queries and result pages
//! - Aggregate statistics over items and mindblocks
//! - Content lifecycle state machine
//! - Configuration loading

pub mod classification;
pub mod config;
pub mod error;
pub mod facets;
pub mod item;
pub mod lifecycle;
pub mod normalizer;
pub mod query;
pub mod stats;
pub mod taxonomy;

pub use classification::{batch_from_tags, heat_from_tier, BatchPolicy, Heat, HeatLevel, KbeStage};
pub use config::CatalogConfig;
pub use error::{Error, NormalizationError, Result};
pub use facets::{build_index, Facet, FacetIndex};
pub use item::ContentItem;
pub use lifecycle::{transition, Role, Status};
pub use normalizer::{normalize, normalize_all, NormalizedBatch, Normalizer};
pub use query::{query, FacetFilter, Filters, QueryResult};
pub use stats::{compute_mindblock_stats, compute_stats, MindblockStats, Stats};
pub use taxonomy::{Taxonomy, TaxonomyRecords};
