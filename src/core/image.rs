//! Image lookup for catalog sets.

use crate::core::price::PriceTable;
use anyhow::Result;

/// Outcome of an image lookup. Rendering branches on this instead of
/// inspecting raw strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageLookup {
    Available(String),
    Unavailable,
}

impl ImageLookup {
    /// Treats a missing or blank URL as unavailable.
    pub fn from_url(url: Option<&str>) -> Self {
        match url.map(str::trim) {
            Some(url) if !url.is_empty() => ImageLookup::Available(url.to_string()),
            _ => ImageLookup::Unavailable,
        }
    }
}

pub trait ImageResolver: Send + Sync {
    fn image_url(&self, item_id: u32, combined: &PriceTable) -> Result<Option<String>>;
}

/// Picks the first listing of the set that carries an image.
#[derive(Debug, Default, Clone, Copy)]
pub struct TableImageResolver;

impl ImageResolver for TableImageResolver {
    fn image_url(&self, item_id: u32, combined: &PriceTable) -> Result<Option<String>> {
        Ok(combined
            .iter()
            .filter(|row| row.item_id == item_id)
            .filter_map(|row| row.image.as_deref())
            .find(|url| !url.trim().is_empty())
            .map(str::to_string))
    }
}
