//! navicue-review library - read-only catalog inspection
//!
//! Loads a taxonomy and a raw record export, normalizes the records and
//! answers facet, query and statistics requests as JSON. Nothing is ever
//! written back to the inputs.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use navicue_core::config::ConfigSource;
use navicue_core::query::filter_items;
use navicue_core::{
    build_index, compute_mindblock_stats, compute_stats, query, CatalogConfig, Filters,
    NormalizedBatch, Normalizer, Taxonomy, TaxonomyRecords,
};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Command-line arguments for navicue-review
#[derive(Parser, Debug)]
#[command(name = "navicue-review")]
#[command(about = "Read-only inspection of the NaviCue catalog")]
#[command(version)]
pub struct Cli {
    /// Taxonomy document (schemas, families, mindblocks)
    #[arg(long, value_name = "FILE")]
    pub taxonomy: PathBuf,

    /// Raw record export (JSON array, or an object with an `items` array)
    #[arg(long, value_name = "FILE")]
    pub records: PathBuf,

    /// Catalog config file (overrides NAVICUE_CONFIG)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log level (overrides the config's [logging] level)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Facet filters and search shared by query-like commands
#[derive(Args, Debug, Clone, Default)]
pub struct Selection {
    /// Facet constraint, repeatable (e.g. --filter status=draft)
    #[arg(long = "filter", value_name = "FACET=VALUE")]
    pub filters: Vec<String>,

    /// Case-insensitive search over name, text, schema and id
    #[arg(long, default_value = "")]
    pub search: String,
}

impl Selection {
    pub fn filters(&self) -> Result<Filters> {
        Filters::from_pairs(&self.filters)
            .with_context(|| format!("Invalid filter in {:?}", self.filters))
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Facet index of all items
    Facets,
    /// One page of matches with live facet counts
    Query {
        #[command(flatten)]
        selection: Selection,
        /// Page number (1-indexed, clamped)
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Statistics for the selected items
    Stats {
        #[command(flatten)]
        selection: Selection,
    },
    /// Mindblock statistics of the taxonomy
    Mindblocks,
    /// Records that failed normalization
    Errors,
}

/// Log level: the command line wins over the config's `[logging] level`
pub fn log_level(cli_level: Option<&str>, config: &CatalogConfig) -> Result<tracing::Level> {
    let level = cli_level.unwrap_or(&config.logging.level);
    level
        .parse()
        .with_context(|| format!("Invalid log level '{}'", level))
}

/// Report where the config came from (call once the subscriber is installed)
pub fn log_config_source(source: &ConfigSource) {
    match source.path() {
        Some(path) => info!(path = %path.display(), source = ?source, "Catalog config resolved"),
        None => warn!("No catalog config found, using defaults"),
    }
}

/// Normalized snapshot of the inputs
#[derive(Debug)]
pub struct Catalog {
    pub taxonomy: Taxonomy,
    pub normalized: NormalizedBatch,
}

impl Catalog {
    /// Load the taxonomy and records and normalize them under `config`
    pub fn open(taxonomy_path: &Path, records_path: &Path, config: &CatalogConfig) -> Result<Self> {
        let taxonomy = load_taxonomy(taxonomy_path)?;
        let raws = load_records(records_path)?;
        let normalized = Normalizer::new(&taxonomy)
            .with_batch_policy(config.batch_policy())
            .normalize_all(&raws);

        if !normalized.is_clean() {
            warn!(
                errors = normalized.errors.len(),
                "Some records could not be normalized (see the errors command)"
            );
        }
        info!(
            items = normalized.items.len(),
            path = %records_path.display(),
            "Catalog loaded"
        );

        Ok(Self {
            taxonomy,
            normalized,
        })
    }
}

/// Read and validate a taxonomy document
pub fn load_taxonomy(path: &Path) -> Result<Taxonomy> {
    if !path.exists() {
        bail!("Taxonomy file not found: {}", path.display());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read taxonomy {}", path.display()))?;
    let records: TaxonomyRecords = serde_json::from_str(&content)
        .with_context(|| format!("Taxonomy {} is not a valid taxonomy document", path.display()))?;
    Taxonomy::from_records(records).context("Taxonomy failed integrity checks")
}

/// Read a raw record export
///
/// Accepts a bare JSON array or a registry list response (`{"items": [...]}`).
pub fn load_records(path: &Path) -> Result<Vec<Value>> {
    if !path.exists() {
        bail!("Records file not found: {}", path.display());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read records {}", path.display()))?;
    let document: Value = serde_json::from_str(&content)
        .with_context(|| format!("Records {} are not valid JSON", path.display()))?;

    match document {
        Value::Array(records) => Ok(records),
        Value::Object(mut object) => match object.remove("items") {
            Some(Value::Array(records)) => Ok(records),
            _ => bail!(
                "Records {} must be an array or an object with an `items` array",
                path.display()
            ),
        },
        _ => bail!("Records {} must be a JSON array", path.display()),
    }
}

/// Execute a command against a loaded catalog
pub fn run(command: &Command, catalog: &Catalog) -> Result<Value> {
    let items = &catalog.normalized.items;
    let output = match command {
        Command::Facets => serde_json::to_value(build_index(items))?,
        Command::Query { selection, page } => {
            let result = query(items, &selection.filters()?, &selection.search);
            json!({
                "page": result.page(*page),
                "facet_counts": result.facet_counts,
            })
        }
        Command::Stats { selection } => {
            let filters = selection.filters()?;
            let selected: Vec<_> = filter_items(items, &filters, &selection.search)
                .cloned()
                .collect();
            serde_json::to_value(compute_stats(&selected))?
        }
        Command::Mindblocks => serde_json::to_value(compute_mindblock_stats(&catalog.taxonomy))?,
        Command::Errors => serde_json::to_value(&catalog.normalized.errors)?,
    };
    Ok(output)
}
