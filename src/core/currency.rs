//! Currency conversion abstractions

use crate::core::error::DashboardError;
use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

#[async_trait]
pub trait CurrencyRateProvider: Send + Sync {
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64>;
}

/// Rates of a set of currencies into a single base currency.
///
/// A rate is the base-currency value of one unit of the keyed currency.
/// Currencies keep the order they were inserted in.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeRateMap {
    base: String,
    rates: Vec<(String, f64)>,
}

impl ExchangeRateMap {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.to_uppercase(),
            rates: Vec::new(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Sets the rate of `currency`, replacing an earlier one in place.
    pub fn insert(&mut self, currency: &str, rate: f64) {
        let currency = currency.to_uppercase();
        match self.rates.iter_mut().find(|(code, _)| *code == currency) {
            Some(entry) => entry.1 = rate,
            None => self.rates.push((currency, rate)),
        }
    }

    /// Rate for `currency`; the base currency always converts at 1.0.
    pub fn rate(&self, currency: &str) -> Option<f64> {
        let currency = currency.to_uppercase();
        if currency == self.base {
            return Some(1.0);
        }
        self.rates
            .iter()
            .find(|(code, _)| *code == currency)
            .map(|(_, rate)| *rate)
    }

    pub fn convert(&self, amount: f64, currency: &str) -> Option<f64> {
        self.rate(currency).map(|rate| amount * rate)
    }

    /// Rates in insertion order, excluding the implicit base entry.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.rates.iter().map(|(code, rate)| (code.as_str(), *rate))
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Stable textual form, used to key cached price fetches on the rates
    /// they were converted with.
    pub fn fingerprint(&self) -> String {
        let pairs: Vec<String> = self
            .rates
            .iter()
            .map(|(code, rate)| format!("{code}={rate}"))
            .collect();
        format!("{}:{}", self.base, pairs.join(","))
    }
}

/// Fetches the rate of every currency in `currencies` into `base`.
///
/// Any single failure aborts: every converted price depends on the map.
pub async fn fetch_rates(
    provider: &(dyn CurrencyRateProvider + Send + Sync),
    currencies: &[String],
    base: &str,
) -> Result<ExchangeRateMap, DashboardError> {
    let mut rates = ExchangeRateMap::new(base);
    for currency in currencies {
        if currency.eq_ignore_ascii_case(base) {
            continue;
        }
        let rate = provider
            .get_rate(currency, rates.base())
            .await
            .map_err(|e| DashboardError::RateFetch {
                currency: currency.to_uppercase(),
                base: rates.base().to_string(),
                reason: e.to_string(),
            })?;
        debug!("Exchange rate {}->{}: {}", currency, base, rate);
        rates.insert(currency, rate);
    }
    Ok(rates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    struct FixedRates;

    #[async_trait]
    impl CurrencyRateProvider for FixedRates {
        async fn get_rate(&self, from: &str, _to: &str) -> Result<f64> {
            match from {
                "USD" => Ok(7.1),
                "EUR" => Ok(7.8),
                _ => Err(anyhow!("Unknown currency {from}")),
            }
        }
    }

    #[test]
    fn test_base_currency_converts_at_one() {
        let mut rates = ExchangeRateMap::new("cny");
        rates.insert("usd", 7.0);
        assert_eq!(rates.rate("CNY"), Some(1.0));
        assert_eq!(rates.convert(10.0, "USD"), Some(70.0));
        assert_eq!(rates.convert(10.0, "GBP"), None);
        assert_eq!(rates.len(), 1);

        rates.insert("EUR", 8.0);
        rates.insert("USD", 7.2);
        let collected: Vec<_> = rates.iter().collect();
        assert_eq!(collected, vec![("USD", 7.2), ("EUR", 8.0)]);
    }

    #[tokio::test]
    async fn test_fetch_rates_skips_base_and_collects_rates() {
        let currencies = vec!["USD".to_string(), "CNY".to_string(), "EUR".to_string()];
        let rates = fetch_rates(&FixedRates, &currencies, "CNY").await.unwrap();
        let collected: Vec<_> = rates.iter().collect();
        assert_eq!(collected, vec![("USD", 7.1), ("EUR", 7.8)]);
        assert_eq!(rates.fingerprint(), "CNY:USD=7.1,EUR=7.8");
    }

    #[tokio::test]
    async fn test_fetch_rates_fails_on_any_currency() {
        let currencies = vec!["USD".to_string(), "SGD".to_string()];
        let err = fetch_rates(&FixedRates, &currencies, "CNY")
            .await
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("SGD->CNY"));
    }
}
