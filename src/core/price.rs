//! Pricing abstractions and core types

use crate::core::currency::ExchangeRateMap;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single listing of a set on one retail website.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub item_name: String,
    pub item_id: u32,
    pub source: String,
    /// Price converted into the base currency.
    pub price: f64,
    pub local_price: f64,
    pub local_currency: String,
    pub image: Option<String>,
}

/// An ordered table of observations. A row's index is its position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    rows: Vec<PriceObservation>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: PriceObservation) {
        self.rows.push(row);
    }

    /// Appends all rows of `other`, keeping their order.
    pub fn append(&mut self, other: PriceTable) {
        self.rows.extend(other.rows);
    }

    pub fn rows(&self) -> &[PriceObservation] {
        &self.rows
    }

    pub fn iter(&self) -> impl Iterator<Item = &PriceObservation> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows matching `predicate`, in table order.
    pub fn filter(&self, predicate: impl Fn(&PriceObservation) -> bool) -> PriceTable {
        self.rows.iter().filter(|row| predicate(row)).cloned().collect()
    }

    /// Distinct sources in order of first appearance.
    pub fn unique_sources(&self) -> Vec<String> {
        let mut sources: Vec<String> = Vec::new();
        for row in &self.rows {
            if !sources.contains(&row.source) {
                sources.push(row.source.clone());
            }
        }
        sources
    }

    /// Highest converted price, or `None` for an empty table.
    pub fn max_price(&self) -> Option<f64> {
        self.rows.iter().map(|row| row.price).reduce(f64::max)
    }
}

impl FromIterator<PriceObservation> for PriceTable {
    fn from_iter<I: IntoIterator<Item = PriceObservation>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for PriceTable {
    type Item = PriceObservation;
    type IntoIter = std::vec::IntoIter<PriceObservation>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

/// A retail source that could not be read for a set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFailure {
    pub source: String,
    pub reason: String,
}

/// Rows fetched for one set, plus the sources that failed to answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemPrices {
    pub table: PriceTable,
    pub failures: Vec<SourceFailure>,
}

impl ItemPrices {
    /// True when every source answered, even if none listed the set.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

impl From<PriceTable> for ItemPrices {
    fn from(table: PriceTable) -> Self {
        Self {
            table,
            failures: Vec::new(),
        }
    }
}

/// Produces the observations of one catalog set across all retail sources,
/// converted with `rates`. An empty table with no failures means no source
/// lists the set.
#[async_trait]
pub trait PriceFetcher: Send + Sync {
    async fn fetch_prices(
        &self,
        item_id: u32,
        item_name: &str,
        rates: &ExchangeRateMap,
    ) -> Result<ItemPrices>;
}

#[cfg(test)]
pub(crate) fn observation(item_name: &str, source: &str, price: f64) -> PriceObservation {
    PriceObservation {
        item_name: item_name.to_string(),
        item_id: 0,
        source: source.to_string(),
        price,
        local_price: price,
        local_currency: "CNY".to_string(),
        image: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_sources_keep_first_appearance_order() {
        let table: PriceTable = vec![
            observation("Apollo", "B", 20.0),
            observation("Apollo", "A", 10.0),
            observation("Jeep", "B", 5.0),
        ]
        .into_iter()
        .collect();
        assert_eq!(table.unique_sources(), vec!["B", "A"]);
        assert_eq!(table.max_price(), Some(20.0));
    }

    #[test]
    fn test_append_preserves_order() {
        let mut first: PriceTable = vec![observation("Apollo", "A", 10.0)].into_iter().collect();
        let second: PriceTable = vec![observation("Jeep", "A", 5.0)].into_iter().collect();
        first.append(second);
        let names: Vec<_> = first.iter().map(|r| r.item_name.as_str()).collect();
        assert_eq!(names, vec!["Apollo", "Jeep"]);
        assert!(PriceTable::new().max_price().is_none());
    }
}
