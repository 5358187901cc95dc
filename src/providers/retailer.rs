use crate::core::config::SourceConfig;
use crate::core::{
    ExchangeRateMap, ItemPrices, PriceFetcher, PriceObservation, PriceTable, SourceFailure,
};
use crate::providers::util::{http_client, with_retry};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

/// Queries every configured retail source for a set's listing.
pub struct RetailerPriceFetcher {
    sources: Vec<SourceConfig>,
    client: reqwest::Client,
}

impl RetailerPriceFetcher {
    pub fn new(sources: Vec<SourceConfig>, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            sources,
            client: http_client(timeout_secs)?,
        })
    }

    /// `Ok(None)` when the source does not list the set.
    async fn fetch_listing(
        &self,
        source: &SourceConfig,
        item_id: u32,
        item_name: &str,
        rates: &ExchangeRateMap,
    ) -> Result<Option<PriceObservation>> {
        let url = source.url_for(item_id);
        debug!("Requesting listing from {}", url);

        let response = with_retry(|| self.client.get(&url).send(), 3, 500)
            .await
            .with_context(|| format!("Failed to send request to {}", source.name))?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("{} does not list set {}", source.name, item_id);
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} from {}",
                response.status(),
                source.name
            ));
        }

        let response_text = response
            .text()
            .await
            .with_context(|| format!("Failed to get response text from {}", source.name))?;
        let listing: ListingResponse = serde_json::from_str(&response_text).with_context(|| {
            format!(
                "Failed to parse listing from {}. Response: '{response_text}'",
                source.name
            )
        })?;

        if !listing.price.is_finite() || listing.price < 0.0 {
            return Err(anyhow!(
                "Invalid price {} from {}",
                listing.price,
                source.name
            ));
        }

        let local_currency = listing
            .currency
            .unwrap_or_else(|| source.currency.clone())
            .to_uppercase();
        let price = rates.convert(listing.price, &local_currency).ok_or_else(|| {
            anyhow!(
                "No exchange rate for {} (listing from {})",
                local_currency,
                source.name
            )
        })?;

        Ok(Some(PriceObservation {
            item_name: item_name.to_string(),
            item_id,
            source: source.name.clone(),
            price,
            local_price: listing.price,
            local_currency,
            image: listing.image,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct ListingResponse {
    price: f64,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    image: Option<String>,
}

#[async_trait]
impl PriceFetcher for RetailerPriceFetcher {
    #[instrument(name = "RetailerPriceFetch", skip(self, rates))]
    async fn fetch_prices(
        &self,
        item_id: u32,
        item_name: &str,
        rates: &ExchangeRateMap,
    ) -> Result<ItemPrices> {
        let listings = join_all(
            self.sources
                .iter()
                .map(|source| self.fetch_listing(source, item_id, item_name, rates)),
        )
        .await;

        let mut table = PriceTable::new();
        let mut failures = Vec::new();
        for (source, listing) in self.sources.iter().zip(listings) {
            match listing {
                Ok(Some(row)) => table.push(row),
                Ok(None) => {}
                Err(e) => {
                    warn!("Skipping {} for set {}: {:#}", source.name, item_id, e);
                    failures.push(SourceFailure {
                        source: source.name.clone(),
                        reason: format!("{e:#}"),
                    });
                }
            }
        }

        if !self.sources.is_empty() && failures.len() == self.sources.len() {
            let last = failures.pop().map(|f| f.reason).unwrap_or_default();
            return Err(anyhow!(
                "All {} sources failed, last error: {}",
                self.sources.len(),
                last
            ));
        }
        Ok(ItemPrices { table, failures })
    }
}
