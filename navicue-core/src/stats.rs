//! Aggregate statistics over content items and the mindblock taxonomy
//!
//! Pure recomputations; nothing here errors and no ratio is ever NaN.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::classification::{Heat, HeatLevel, KbeStage};
use crate::item::ContentItem;
use crate::lifecycle::Status;
use crate::taxonomy::Taxonomy;

/// Batches always reported, even at zero
const BASELINE_BATCHES: [u32; 4] = [1, 2, 3, 4];

/// Item counts per heat level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HeatCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub unclassified: usize,
}

impl HeatCounts {
    fn add(&mut self, level: Option<HeatLevel>) {
        match level {
            Some(HeatLevel::High) => self.high += 1,
            Some(HeatLevel::Medium) => self.medium += 1,
            Some(HeatLevel::Low) => self.low += 1,
            None => self.unclassified += 1,
        }
    }
}

/// Counts per KBE stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KbeCounts {
    pub knowing: usize,
    pub believing: usize,
    pub embodying: usize,
    /// Items whose layer is absent or outside the known vocabularies
    pub unclassified: usize,
}

impl KbeCounts {
    fn add(&mut self, stage: Option<KbeStage>) {
        match stage {
            Some(KbeStage::Knowing) => self.knowing += 1,
            Some(KbeStage::Believing) => self.believing += 1,
            Some(KbeStage::Embodying) => self.embodying += 1,
            None => self.unclassified += 1,
        }
    }
}

/// Item counts per lifecycle status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub draft: usize,
    pub review: usize,
    pub published: usize,
    pub deprecated: usize,
}

impl StatusCounts {
    fn add(&mut self, status: Status) {
        match status {
            Status::Draft => self.draft += 1,
            Status::Review => self.review += 1,
            Status::Published => self.published += 1,
            Status::Deprecated => self.deprecated += 1,
        }
    }
}

/// Aggregates over a content item collection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub total: usize,
    pub by_batch: BTreeMap<u32, usize>,
    pub by_heat: HeatCounts,
    pub by_kbe: KbeCounts,
    pub by_status: StatusCounts,
    pub exposures: u64,
    pub completions: u64,
    /// completions / exposures, 0 when nothing was exposed
    pub completion_rate: f64,
    /// Mean effectiveness, missing scores counting as 0
    pub avg_effectiveness: f64,
}

/// Compute statistics for an item collection
pub fn compute_stats(items: &[ContentItem]) -> Stats {
    let mut by_batch: BTreeMap<u32, usize> = BASELINE_BATCHES.iter().map(|&b| (b, 0)).collect();
    let mut by_heat = HeatCounts::default();
    let mut by_kbe = KbeCounts::default();
    let mut by_status = StatusCounts::default();
    let mut exposures = 0u64;
    let mut completions = 0u64;
    let mut effectiveness_sum = 0.0f64;

    for item in items {
        *by_batch.entry(item.batch).or_default() += 1;
        by_heat.add(item.heat_level);
        by_kbe.add(item.kbe_stage);
        by_status.add(item.status);
        exposures = exposures.saturating_add(item.exposures_count.unwrap_or(0));
        completions = completions.saturating_add(item.completions_count.unwrap_or(0));
        effectiveness_sum += item
            .avg_effectiveness
            .filter(|score| score.is_finite())
            .unwrap_or(0.0);
    }

    let completion_rate = if exposures == 0 {
        0.0
    } else {
        completions as f64 / exposures as f64
    };
    let avg_effectiveness = if items.is_empty() {
        0.0
    } else {
        effectiveness_sum / items.len() as f64
    };

    debug!(
        total = items.len(),
        exposures,
        completions,
        "Stats computed"
    );

    Stats {
        total: items.len(),
        by_batch,
        by_heat,
        by_kbe,
        by_status,
        exposures,
        completions,
        completion_rate,
        avg_effectiveness,
    }
}

/// Mindblock counts per heat
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct MindblockHeatCounts {
    pub red: usize,
    pub amber: usize,
    pub green: usize,
}

/// Mindblock count for one schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaCount {
    pub key: String,
    pub title: String,
    pub count: usize,
}

/// Heat × KBE counts
///
/// Rows follow [`Heat::ALL`] (RED, AMBER, GREEN), columns follow
/// [`KbeStage::ALL`] (Knowing, Believing, Embodying).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct HeatKbeMatrix {
    cells: [[usize; 3]; 3],
}

impl HeatKbeMatrix {
    pub fn get(&self, heat: Heat, stage: KbeStage) -> usize {
        self.cells[heat_row(heat)][kbe_column(stage)]
    }

    fn add(&mut self, heat: Heat, stage: KbeStage) {
        self.cells[heat_row(heat)][kbe_column(stage)] += 1;
    }
}

fn heat_row(heat: Heat) -> usize {
    match heat {
        Heat::Red => 0,
        Heat::Amber => 1,
        Heat::Green => 2,
    }
}

fn kbe_column(stage: KbeStage) -> usize {
    match stage {
        KbeStage::Knowing => 0,
        KbeStage::Believing => 1,
        KbeStage::Embodying => 2,
    }
}

/// Aggregates over the mindblocks of a taxonomy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MindblockStats {
    pub total: usize,
    pub by_heat: MindblockHeatCounts,
    pub by_kbe: KbeCounts,
    /// Every schema in taxonomy order, including those with no mindblocks
    pub by_schema: Vec<SchemaCount>,
    pub heat_kbe_matrix: HeatKbeMatrix,
}

/// Compute mindblock statistics for a taxonomy
pub fn compute_mindblock_stats(taxonomy: &Taxonomy) -> MindblockStats {
    let mut by_heat = MindblockHeatCounts::default();
    let mut by_kbe = KbeCounts::default();
    let mut matrix = HeatKbeMatrix::default();
    let mut per_schema: BTreeMap<&str, usize> = BTreeMap::new();

    for mindblock in taxonomy.mindblocks() {
        match mindblock.heat {
            Heat::Red => by_heat.red += 1,
            Heat::Amber => by_heat.amber += 1,
            Heat::Green => by_heat.green += 1,
        }
        by_kbe.add(Some(mindblock.kbe_stage));
        matrix.add(mindblock.heat, mindblock.kbe_stage);
        if let Some(schema) = taxonomy.family_of_mindblock(&mindblock.key).map(|f| f.schema_key.as_str()) {
            *per_schema.entry(schema).or_default() += 1;
        }
    }

    let by_schema = taxonomy
        .schemas()
        .iter()
        .map(|schema| SchemaCount {
            key: schema.key.clone(),
            title: schema.title.clone(),
            count: per_schema.get(schema.key.as_str()).copied().unwrap_or(0),
        })
        .collect();

    debug!(mindblocks = taxonomy.mindblocks().len(), "Mindblock stats computed");

    MindblockStats {
        total: taxonomy.mindblocks().len(),
        by_heat,
        by_kbe,
        by_schema,
        heat_kbe_matrix: matrix,
    }
}
