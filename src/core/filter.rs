//! Filtering and aggregation of the combined price table.
//!
//! Every render recomputes the stages from the unfiltered table:
//! item filter, source filter, price ceiling, then the price bounds.
use crate::core::price::{PriceObservation, PriceTable};
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Concrete, conjunctive filter over a price table. Price bounds are inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub items: HashSet<String>,
    pub sources: HashSet<String>,
    pub min_price: f64,
    pub max_price: f64,
}

impl Selection {
    pub fn matches(&self, row: &PriceObservation) -> bool {
        self.items.contains(&row.item_name)
            && self.sources.contains(&row.source)
            && row.price <= self.max_price
            && row.price >= self.min_price
    }
}

/// Rows of `table` accepted by `selection`, in table order.
///
/// An empty item or source set selects nothing.
pub fn filter_by_selection(table: &PriceTable, selection: &Selection) -> PriceTable {
    table.filter(|row| selection.matches(row))
}

/// Mean price of one (source, set) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AveragePrice {
    pub source: String,
    pub item_name: String,
    pub price: f64,
    pub observations: usize,
}

/// Groups by (source, set) and averages the price only, sorted by key.
pub fn compute_averages(filtered: &PriceTable) -> Vec<AveragePrice> {
    let mut groups: BTreeMap<(&str, &str), (f64, usize)> = BTreeMap::new();
    for row in filtered.iter() {
        let entry = groups
            .entry((row.source.as_str(), row.item_name.as_str()))
            .or_insert((0.0, 0));
        entry.0 += row.price;
        entry.1 += 1;
    }

    groups
        .into_iter()
        .map(|((source, item_name), (sum, count))| AveragePrice {
            source: source.to_string(),
            item_name: item_name.to_string(),
            price: sum / count as f64,
            observations: count,
        })
        .collect()
}

/// What the filter widgets remember between renders.
///
/// Deselections are stored rather than selections so that every set and
/// every newly seen source starts out selected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub hidden_items: BTreeSet<String>,
    pub hidden_sources: BTreeSet<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

impl ViewState {
    pub fn toggle_item(&mut self, name: &str) {
        if !self.hidden_items.remove(name) {
            self.hidden_items.insert(name.to_string());
        }
    }

    pub fn toggle_source(&mut self, name: &str) {
        if !self.hidden_sources.remove(name) {
            self.hidden_sources.insert(name.to_string());
        }
    }

    /// Rewrites the hidden names to their canonical spelling, matching
    /// case-insensitively against the known sets and sources.
    ///
    /// Fails on a name that matches nothing.
    pub fn resolve_names(self, items: &[String], sources: &[String]) -> Result<Self> {
        Ok(Self {
            hidden_items: canonical_names(&self.hidden_items, items, "set")?,
            hidden_sources: canonical_names(&self.hidden_sources, sources, "source")?,
            ..self
        })
    }
}

fn canonical_names(
    names: &BTreeSet<String>,
    known: &[String],
    kind: &str,
) -> Result<BTreeSet<String>> {
    names
        .iter()
        .map(|name| {
            known
                .iter()
                .find(|candidate| candidate.eq_ignore_ascii_case(name.trim()))
                .cloned()
                .ok_or_else(|| anyhow!("Unknown {}: {}", kind, name))
        })
        .collect()
}

/// Result of running the filter stages for one render.
#[derive(Debug, Clone)]
pub struct FilteredView {
    /// Sources present after the item filter, in first-appearance order.
    pub selectable_sources: Vec<String>,
    /// Upper bound of the price sliders.
    pub price_ceiling: f64,
    pub selection: Selection,
    pub filtered: PriceTable,
    pub averages: Vec<AveragePrice>,
}

/// Runs the filter stages over `combined`.
///
/// `catalog_names` are the selectable sets. The price ceiling comes from
/// the source-filtered rows, before either price bound applies, and the
/// requested bounds are clamped into `[0, ceiling]`.
pub fn apply_view(
    combined: &PriceTable,
    catalog_names: &[String],
    view: &ViewState,
) -> FilteredView {
    let items: HashSet<String> = catalog_names
        .iter()
        .filter(|name| !view.hidden_items.contains(*name))
        .cloned()
        .collect();
    let item_filtered = combined.filter(|row| items.contains(&row.item_name));

    let selectable_sources = item_filtered.unique_sources();
    let sources: HashSet<String> = selectable_sources
        .iter()
        .filter(|source| !view.hidden_sources.contains(*source))
        .cloned()
        .collect();
    let source_filtered = item_filtered.filter(|row| sources.contains(&row.source));

    let price_ceiling = source_filtered.max_price().unwrap_or(0.0).max(0.0);
    let clamp = |value: f64| value.max(0.0).min(price_ceiling);
    let max_price = view.max_price.map_or(price_ceiling, clamp);
    let min_price = view.min_price.map_or(0.0, clamp);

    let filtered = source_filtered
        .filter(|row| row.price <= max_price)
        .filter(|row| row.price >= min_price);
    let averages = compute_averages(&filtered);

    FilteredView {
        selectable_sources,
        price_ceiling,
        selection: Selection {
            items,
            sources,
            min_price,
            max_price,
        },
        filtered,
        averages,
    }
}
