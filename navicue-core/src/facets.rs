//! Facet dimensions and the derived facet index
//!
//! A [`FacetIndex`] is a pure function of an item collection: it is rebuilt on
//! demand and never edited in place. Every facet list starts with the `"all"`
//! sentinel carrying the collection size, followed by the distinct values
//! present with the number of items holding each.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::error::Error;
use crate::item::ContentItem;

/// Sentinel facet value meaning "no constraint"
pub const ALL: &str = "all";

/// A filterable dimension over content items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Facet {
    Schema,
    Family,
    Pillar,
    Heat,
    Kbe,
    Batch,
    Status,
    Tag,
    /// Whether the item resolved fully against the taxonomy
    Mapping,
}

impl Facet {
    pub const ALL: [Facet; 9] = [
        Facet::Schema,
        Facet::Family,
        Facet::Pillar,
        Facet::Heat,
        Facet::Kbe,
        Facet::Batch,
        Facet::Status,
        Facet::Tag,
        Facet::Mapping,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Facet::Schema => "schema",
            Facet::Family => "family",
            Facet::Pillar => "pillar",
            Facet::Heat => "heat",
            Facet::Kbe => "kbe",
            Facet::Batch => "batch",
            Facet::Status => "status",
            Facet::Tag => "tag",
            Facet::Mapping => "mapping",
        }
    }

    /// Values an item contributes to this facet
    ///
    /// Items without a heat level or KBE layer contribute nothing to those
    /// facets; every tag is a separate value.
    pub fn values_of(self, item: &ContentItem) -> Vec<String> {
        match self {
            Facet::Schema => vec![item.schema.clone()],
            Facet::Family => vec![item.family.clone()],
            Facet::Pillar => vec![item.pillar.clone()],
            Facet::Heat => item.heat_level.iter().map(|h| h.as_str().to_string()).collect(),
            Facet::Kbe => item.kbe_label().into_iter().map(str::to_string).collect(),
            Facet::Batch => vec![item.batch.to_string()],
            Facet::Status => vec![item.status.as_str().to_string()],
            Facet::Tag => item.tags.iter().cloned().collect(),
            Facet::Mapping => vec![item.mapping().to_string()],
        }
    }

    /// Whether an item holds `value` on this facet (exact match)
    pub fn matches(self, item: &ContentItem, value: &str) -> bool {
        match self {
            Facet::Schema => item.schema == value,
            Facet::Family => item.family == value,
            Facet::Pillar => item.pillar == value,
            Facet::Heat => item.heat_level.is_some_and(|h| h.as_str() == value),
            Facet::Kbe => item.kbe_label() == Some(value),
            Facet::Batch => value.parse::<u32>().is_ok_and(|b| b == item.batch),
            Facet::Status => item.status.as_str() == value,
            Facet::Tag => item.tags.contains(value),
            Facet::Mapping => item.mapping() == value,
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Facet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "schema" => Ok(Facet::Schema),
            "family" => Ok(Facet::Family),
            "pillar" => Ok(Facet::Pillar),
            "heat" | "heat_level" => Ok(Facet::Heat),
            "kbe" | "kbe_stage" | "kbe_layer" => Ok(Facet::Kbe),
            "batch" => Ok(Facet::Batch),
            "status" => Ok(Facet::Status),
            "tag" | "tags" => Ok(Facet::Tag),
            "mapping" => Ok(Facet::Mapping),
            other => Err(Error::InvalidInput(format!("unknown facet '{}'", other))),
        }
    }
}

/// One selectable value of a facet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetOption {
    pub value: String,
    pub count: usize,
}

/// Distinct values per facet, `"all"` first
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FacetIndex {
    facets: BTreeMap<Facet, Vec<FacetOption>>,
}

impl FacetIndex {
    /// Options of a facet, starting with `"all"`
    pub fn options(&self, facet: Facet) -> &[FacetOption] {
        self.facets.get(&facet).map(Vec::as_slice).unwrap_or_default()
    }

    /// Option values of a facet, starting with `"all"`
    pub fn values(&self, facet: Facet) -> Vec<&str> {
        self.options(facet).iter().map(|o| o.value.as_str()).collect()
    }

    /// Item count for one value (`None` when the value is not present)
    pub fn count(&self, facet: Facet, value: &str) -> Option<usize> {
        self.options(facet)
            .iter()
            .find(|o| o.value == value)
            .map(|o| o.count)
    }
}

/// Build the facet index of an item collection
///
/// A data value spelled exactly like the `"all"` sentinel is left out of the
/// index: it could never be selected, since a filter on `"all"` means no
/// constraint.
pub fn build_index(items: &[ContentItem]) -> FacetIndex {
    let mut facets = BTreeMap::new();

    for facet in Facet::ALL {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut colliding = 0usize;
        for item in items {
            for value in facet.values_of(item) {
                if value == ALL {
                    colliding += 1;
                    continue;
                }
                *counts.entry(value).or_default() += 1;
            }
        }
        if colliding > 0 {
            warn!(
                facet = %facet,
                items = colliding,
                "Facet value collides with the \"all\" sentinel and is not indexed"
            );
        }

        let mut distinct: Vec<FacetOption> = counts
            .into_iter()
            .map(|(value, count)| FacetOption { value, count })
            .collect();
        if facet == Facet::Batch {
            distinct.sort_by_key(|o| o.value.parse::<u32>().unwrap_or(u32::MAX));
        }

        let mut options = Vec::with_capacity(distinct.len() + 1);
        options.push(FacetOption {
            value: ALL.to_string(),
            count: items.len(),
        });
        options.extend(distinct);
        facets.insert(facet, options);
    }

    debug!(items = items.len(), "Facet index built");

    FacetIndex { facets }
}
