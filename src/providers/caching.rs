use crate::core::cache::{Cache, CacheKey};
use crate::core::{CurrencyRateProvider, ExchangeRateMap, ItemPrices, PriceFetcher, PriceTable};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Memoized fetch results of a session. Cleared by the refresh action.
#[derive(Clone, Default)]
pub struct FetchCache {
    pub rates: Arc<Cache<CacheKey, f64>>,
    pub prices: Arc<Cache<CacheKey, PriceTable>>,
}

impl FetchCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn clear(&self) {
        self.rates.clear().await;
        self.prices.clear().await;
        debug!("Fetch cache cleared");
    }
}

// Caching for CurrencyRateProvider. Failures are not cached.
pub struct CachingCurrencyRateProvider<T: CurrencyRateProvider> {
    inner: T,
    cache: Arc<Cache<CacheKey, f64>>,
}

impl<T: CurrencyRateProvider> CachingCurrencyRateProvider<T> {
    pub fn new(inner: T, cache: Arc<Cache<CacheKey, f64>>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl<T: CurrencyRateProvider> CurrencyRateProvider for CachingCurrencyRateProvider<T> {
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64> {
        let key = CacheKey::new("get_rate", format!("{from}-{to}"));
        if let Some(rate) = self.cache.get(&key).await {
            return Ok(rate);
        }
        let rate = self.inner.get_rate(from, to).await?;
        self.cache.put(key, rate).await;
        Ok(rate)
    }
}

// Caching for PriceFetcher, keyed on the set and the rates used. Only results
// where every source answered are cached.
pub struct CachingPriceFetcher<T: PriceFetcher> {
    inner: T,
    cache: Arc<Cache<CacheKey, PriceTable>>,
}

impl<T: PriceFetcher> CachingPriceFetcher<T> {
    pub fn new(inner: T, cache: Arc<Cache<CacheKey, PriceTable>>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl<T: PriceFetcher> PriceFetcher for CachingPriceFetcher<T> {
    async fn fetch_prices(
        &self,
        item_id: u32,
        item_name: &str,
        rates: &ExchangeRateMap,
    ) -> Result<ItemPrices> {
        let key = CacheKey::new(
            "fetch_prices",
            format!("{item_id}|{item_name}|{}", rates.fingerprint()),
        );
        if let Some(table) = self.cache.get(&key).await {
            return Ok(table.into());
        }
        let prices = self.inner.fetch_prices(item_id, item_name, rates).await?;
        if prices.is_complete() {
            self.cache.put(key, prices.table.clone()).await;
        } else {
            debug!(
                "Not caching {} ({}): {} sources failed",
                item_name,
                item_id,
                prices.failures.len()
            );
        }
        Ok(prices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SourceFailure;
    use crate::core::price::observation;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingRates {
        call_count: AtomicUsize,
    }

    #[async_trait]
    impl<'a> CurrencyRateProvider for &'a CountingRates {
        async fn get_rate(&self, from: &str, _to: &str) -> Result<f64> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if from == "USD" {
                Ok(7.0)
            } else {
                Err(anyhow!("Unknown currency"))
            }
        }
    }

    struct CountingFetcher {
        call_count: AtomicUsize,
    }

    #[async_trait]
    impl<'a> PriceFetcher for &'a CountingFetcher {
        async fn fetch_prices(
            &self,
            _item_id: u32,
            item_name: &str,
            _rates: &ExchangeRateMap,
        ) -> Result<ItemPrices> {
            let call = self.call_count.fetch_add(1, Ordering::SeqCst);
            let table: PriceTable = vec![observation(item_name, "A", 10.0)].into_iter().collect();
            // "Flaky" loses source B on its first call only
            let failures = if item_name == "Flaky" && call == 0 {
                vec![SourceFailure {
                    source: "B".to_string(),
                    reason: "HTTP error: 503".to_string(),
                }]
            } else {
                Vec::new()
            };
            Ok(ItemPrices { table, failures })
        }
    }

    #[tokio::test]
    async fn test_caching_currency_provider() {
        let inner = CountingRates {
            call_count: AtomicUsize::new(0),
        };
        let cache = FetchCache::new();
        let provider = CachingCurrencyRateProvider::new(&inner, Arc::clone(&cache.rates));

        assert_eq!(provider.get_rate("USD", "CNY").await.unwrap(), 7.0);
        assert_eq!(provider.get_rate("USD", "CNY").await.unwrap(), 7.0);
        assert_eq!(inner.call_count.load(Ordering::SeqCst), 1);

        // Failures are retried on the next call
        assert!(provider.get_rate("GBP", "CNY").await.is_err());
        assert!(provider.get_rate("GBP", "CNY").await.is_err());
        assert_eq!(inner.call_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_caching_price_fetcher_refreshes_after_clear() {
        let inner = CountingFetcher {
            call_count: AtomicUsize::new(0),
        };
        let cache = FetchCache::new();
        let fetcher = CachingPriceFetcher::new(&inner, Arc::clone(&cache.prices));
        let mut rates = ExchangeRateMap::new("CNY");
        rates.insert("USD", 7.0);

        fetcher.fetch_prices(1, "Apollo", &rates).await.unwrap();
        fetcher.fetch_prices(1, "Apollo", &rates).await.unwrap();
        assert_eq!(inner.call_count.load(Ordering::SeqCst), 1);

        // Different rates are a different call
        rates.insert("USD", 7.2);
        fetcher.fetch_prices(1, "Apollo", &rates).await.unwrap();
        assert_eq!(inner.call_count.load(Ordering::SeqCst), 2);

        cache.clear().await;
        let prices = fetcher.fetch_prices(1, "Apollo", &rates).await.unwrap();
        assert_eq!(prices.table.rows()[0].item_name, "Apollo");
        assert!(prices.is_complete());
        assert_eq!(inner.call_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_partial_results_are_not_cached() {
        let inner = CountingFetcher {
            call_count: AtomicUsize::new(0),
        };
        let cache = FetchCache::new();
        let fetcher = CachingPriceFetcher::new(&inner, Arc::clone(&cache.prices));
        let rates = ExchangeRateMap::new("CNY");

        let first = fetcher.fetch_prices(7, "Flaky", &rates).await.unwrap();
        assert_eq!(first.failures.len(), 1);
        assert!(cache.prices.is_empty().await);

        let second = fetcher.fetch_prices(7, "Flaky", &rates).await.unwrap();
        assert!(second.is_complete());
        assert_eq!(inner.call_count.load(Ordering::SeqCst), 2);

        // Complete now, served from the cache
        let third = fetcher.fetch_prices(7, "Flaky", &rates).await.unwrap();
        assert!(third.is_complete());
        assert_eq!(inner.call_count.load(Ordering::SeqCst), 2);
    }
}
