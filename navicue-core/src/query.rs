//! Multi-facet filter and free-text search over content items
//!
//! Facet filters combine with AND; free-text search is one more AND-ed
//! constraint. Matches keep the input order (ranking is a presentation
//! concern), and the returned facet counts are rebuilt from the match set so
//! option lists only offer what is still selectable.

use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::Range;
use tracing::debug;

use crate::error::Error;
use crate::facets::{build_index, Facet, FacetIndex, ALL};
use crate::item::ContentItem;

/// Matches per result page
pub const PAGE_SIZE: usize = 100;

/// Constraint on a single facet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetFilter {
    /// No constraint
    #[default]
    All,
    /// Item must hold exactly this value
    Exact(String),
}

impl FacetFilter {
    /// Parse a filter value; the `"all"` sentinel means no constraint
    pub fn parse(value: &str) -> Self {
        if value == ALL {
            FacetFilter::All
        } else {
            FacetFilter::Exact(value.to_string())
        }
    }

    fn accepts(&self, facet: Facet, item: &ContentItem) -> bool {
        match self {
            FacetFilter::All => true,
            FacetFilter::Exact(value) => facet.matches(item, value),
        }
    }
}

/// Set of facet filters; facets not mentioned are unconstrained
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Filters {
    by_facet: BTreeMap<Facet, FacetFilter>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the filter for a facet
    pub fn with(mut self, facet: Facet, value: &str) -> Self {
        self.set(facet, FacetFilter::parse(value));
        self
    }

    pub fn set(&mut self, facet: Facet, filter: FacetFilter) {
        self.by_facet.insert(facet, filter);
    }

    pub fn get(&self, facet: Facet) -> &FacetFilter {
        static UNCONSTRAINED: FacetFilter = FacetFilter::All;
        self.by_facet.get(&facet).unwrap_or(&UNCONSTRAINED)
    }

    /// Build filters from `facet=value` pairs
    ///
    /// A later pair for the same facet replaces an earlier one.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filters = Filters::new();
        for pair in pairs {
            let (facet, value) = parse_filter_pair(pair.as_ref())?;
            filters.set(facet, FacetFilter::parse(value));
        }
        Ok(filters)
    }

    /// True when no facet is constrained
    pub fn is_unconstrained(&self) -> bool {
        self.by_facet.values().all(|f| *f == FacetFilter::All)
    }

    fn accepts(&self, item: &ContentItem) -> bool {
        self.by_facet
            .iter()
            .all(|(facet, filter)| filter.accepts(*facet, item))
    }
}

/// Parse a single `facet=value` pair
fn parse_filter_pair(pair: &str) -> Result<(Facet, &str), Error> {
    let (facet, value) = pair
        .split_once('=')
        .ok_or_else(|| Error::InvalidInput(format!("expected FACET=VALUE, got '{}'", pair)))?;
    Ok((facet.parse()?, value.trim()))
}

/// Query outcome
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    /// Matching items in input order
    pub matches: Vec<ContentItem>,
    /// Facet index of the match set
    pub facet_counts: FacetIndex,
    /// Size of the collection before filtering
    pub total: usize,
}

/// One page of a query result
#[derive(Debug, Clone, Serialize)]
pub struct ResultPage<'a> {
    /// Page number (1-indexed) after clamping
    pub page: usize,
    pub total_pages: usize,
    pub matched: usize,
    pub total: usize,
    pub items: &'a [ContentItem],
}

impl QueryResult {
    /// Page `n` (1-indexed) of the matches
    ///
    /// `n` is clamped to the available pages; with no matches the result is
    /// an empty page 1 of 0.
    pub fn page(&self, n: usize) -> ResultPage<'_> {
        let matched = self.matches.len();
        let total_pages = matched.div_ceil(PAGE_SIZE);
        let page = n.clamp(1, total_pages.max(1));
        ResultPage {
            page,
            total_pages,
            matched,
            total: self.total,
            items: &self.matches[page_range(page, matched)],
        }
    }
}

fn page_range(page: usize, matched: usize) -> Range<usize> {
    let start = ((page - 1) * PAGE_SIZE).min(matched);
    start..(start + PAGE_SIZE).min(matched)
}

/// Lowercased search needle, `None` when the search is blank
fn needle(search: &str) -> Option<String> {
    let trimmed = search.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
}

/// Case-insensitive substring match on name, text, schema label or id
fn search_matches(item: &ContentItem, needle: &str) -> bool {
    [&item.name, &item.text_line, &item.schema, &item.id]
        .into_iter()
        .any(|field| field.to_lowercase().contains(needle))
}

/// Items passing every filter and the search, in input order
pub fn filter_items<'a>(
    items: &'a [ContentItem],
    filters: &Filters,
    search: &str,
) -> impl Iterator<Item = &'a ContentItem> {
    let filters = filters.clone();
    let needle = needle(search);
    items.iter().filter(move |item| {
        filters.accepts(item)
            && needle
                .as_deref()
                .map_or(true, |needle| search_matches(item, needle))
    })
}

/// Filter and search an item collection
pub fn query(items: &[ContentItem], filters: &Filters, search: &str) -> QueryResult {
    let matches: Vec<ContentItem> = filter_items(items, filters, search).cloned().collect();
    let facet_counts = build_index(&matches);

    debug!(
        total = items.len(),
        matched = matches.len(),
        search = %search.trim(),
        "Query evaluated"
    );

    QueryResult {
        matches,
        facet_counts,
        total: items.len(),
    }
}
