//! Core business logic abstractions

pub mod cache;
pub mod config;
pub mod currency;
pub mod dashboard;
pub mod error;
pub mod filter;
pub mod image;
pub mod log;
pub mod price;

// Re-export main types for cleaner imports
pub use currency::{CurrencyRateProvider, ExchangeRateMap};
pub use error::DashboardError;
pub use image::{ImageLookup, ImageResolver};
pub use price::{ItemPrices, PriceFetcher, PriceObservation, PriceTable, SourceFailure};
