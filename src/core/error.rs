//! Failure taxonomy of a dashboard render.

use thiserror::Error;

/// Errors raised while assembling the dashboard.
///
/// Only `RateFetch` is fatal. `ItemFetch` is collected as a warning and the
/// item contributes no rows. `SourceFetch` marks a single retail source that
/// was skipped for a set. `ImageResolution` falls back to placeholder text.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Failed to fetch exchange rate {currency}->{base}: {reason}")]
    RateFetch {
        currency: String,
        base: String,
        reason: String,
    },

    #[error("Failed to fetch prices for {name} ({id}): {reason}")]
    ItemFetch { name: String, id: u32, reason: String },

    #[error("Failed to fetch {name} ({id}) from {source_name}: {reason}")]
    SourceFetch {
        name: String,
        id: u32,
        source_name: String,
        reason: String,
    },

    #[error("Failed to resolve image for set {id}: {reason}")]
    ImageResolution { id: u32, reason: String },
}

impl DashboardError {
    /// Whether the error prevents rendering anything at all.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DashboardError::RateFetch { .. })
    }
}
