pub mod caching;
pub mod retailer;
pub mod util;
pub mod yahoo_finance;

pub use crate::core::cache::{Cache, CacheKey};
