//! Assembles the data behind one dashboard render.
use crate::core::config::{AppConfig, CatalogItem};
use crate::core::currency::{self, CurrencyRateProvider, ExchangeRateMap};
use crate::core::error::DashboardError;
use crate::core::image::{ImageLookup, ImageResolver};
use crate::core::price::{PriceFetcher, PriceTable};
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

/// Combined table of all catalog sets plus the items and sources that failed.
#[derive(Debug, Default)]
pub struct CombinedPrices {
    pub table: PriceTable,
    pub warnings: Vec<DashboardError>,
}

/// Everything fetched for one render cycle.
#[derive(Debug)]
pub struct DashboardData {
    pub rates: ExchangeRateMap,
    pub combined: PriceTable,
    pub warnings: Vec<DashboardError>,
    pub fetched_at: DateTime<Utc>,
}

/// Fetches every catalog set in order and concatenates the rows.
///
/// A set whose fetch fails, or that no source lists, contributes no rows and
/// is reported in `warnings`. Each source skipped for a set is reported too.
/// `on_item_done` is called once per set.
pub async fn build_combined_table(
    catalog: &[CatalogItem],
    rates: &ExchangeRateMap,
    fetcher: &(dyn PriceFetcher + Send + Sync),
    on_item_done: &(dyn Fn() + Sync),
) -> CombinedPrices {
    let mut combined = CombinedPrices::default();

    for item in catalog {
        match fetcher.fetch_prices(item.id, &item.name, rates).await {
            Ok(prices) => {
                for failure in prices.failures {
                    combined.warnings.push(DashboardError::SourceFetch {
                        name: item.name.clone(),
                        id: item.id,
                        source_name: failure.source,
                        reason: failure.reason,
                    });
                }
                if prices.table.is_empty() {
                    debug!("No listings for {} ({})", item.name, item.id);
                    combined.warnings.push(DashboardError::ItemFetch {
                        name: item.name.clone(),
                        id: item.id,
                        reason: "no source lists this set".to_string(),
                    });
                } else {
                    debug!("Fetched {} prices for {}", prices.table.len(), item.name);
                    combined.table.append(prices.table);
                }
            }
            Err(e) => {
                warn!("Price fetch failed for {} ({}): {}", item.name, item.id, e);
                combined.warnings.push(DashboardError::ItemFetch {
                    name: item.name.clone(),
                    id: item.id,
                    reason: format!("{e:#}"),
                });
            }
        }
        on_item_done();
    }

    combined
}

/// Looks up the image of a set in the unfiltered table. Never fails.
pub fn resolve_image(
    item_id: u32,
    combined: &PriceTable,
    resolver: &(dyn ImageResolver + Send + Sync),
) -> ImageLookup {
    match resolver.image_url(item_id, combined) {
        Ok(url) => ImageLookup::from_url(url.as_deref()),
        Err(e) => {
            let error = DashboardError::ImageResolution {
                id: item_id,
                reason: e.to_string(),
            };
            warn!("{error}");
            ImageLookup::Unavailable
        }
    }
}

/// Fetches rates, then the combined table for the whole catalog.
///
/// Only a rate failure is returned as an error.
#[instrument(name = "LoadDashboard", skip_all, fields(items = config.catalog.len()))]
pub async fn load_dashboard(
    config: &AppConfig,
    rate_provider: &(dyn CurrencyRateProvider + Send + Sync),
    fetcher: &(dyn PriceFetcher + Send + Sync),
    on_item_done: &(dyn Fn() + Sync),
) -> Result<DashboardData, DashboardError> {
    let rates =
        currency::fetch_rates(rate_provider, &config.rate_currencies(), &config.base_currency)
            .await?;
    let combined = build_combined_table(&config.catalog, &rates, fetcher, on_item_done).await;
    info!(
        rows = combined.table.len(),
        warnings = combined.warnings.len(),
        "Dashboard data loaded"
    );

    Ok(DashboardData {
        rates,
        combined: combined.table,
        warnings: combined.warnings,
        fetched_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::image::TableImageResolver;
    use crate::core::price::{ItemPrices, PriceObservation, SourceFailure};
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubFetcher;

    #[async_trait]
    impl PriceFetcher for StubFetcher {
        async fn fetch_prices(
            &self,
            item_id: u32,
            item_name: &str,
            rates: &ExchangeRateMap,
        ) -> Result<ItemPrices> {
            let row = |source: &str, local: f64| PriceObservation {
                item_name: item_name.to_string(),
                item_id,
                source: source.to_string(),
                price: rates.convert(local, "USD").unwrap(),
                local_price: local,
                local_currency: "USD".to_string(),
                image: Some(format!("https://img/{item_id}.png")),
            };
            let table: PriceTable = match item_id {
                1 => vec![row("A", 10.0), row("B", 20.0)].into_iter().collect(),
                2 => return Err(anyhow!("connection reset")),
                3 => PriceTable::new(),
                _ => vec![row("A", 5.0)].into_iter().collect(),
            };
            // Jeep loses source B
            let failures = match item_id {
                4 => vec![SourceFailure {
                    source: "B".to_string(),
                    reason: "HTTP error: 503".to_string(),
                }],
                _ => Vec::new(),
            };
            Ok(ItemPrices { table, failures })
        }
    }

    struct FailingResolver;

    impl ImageResolver for FailingResolver {
        fn image_url(&self, _item_id: u32, _combined: &PriceTable) -> Result<Option<String>> {
            Err(anyhow!("lookup exploded"))
        }
    }

    fn catalog() -> Vec<CatalogItem> {
        [("Apollo", 1), ("Broken", 2), ("Empty", 3), ("Jeep", 4)]
            .into_iter()
            .map(|(name, id)| CatalogItem {
                name: name.to_string(),
                id,
            })
            .collect()
    }

    fn usd_rates() -> ExchangeRateMap {
        let mut rates = ExchangeRateMap::new("CNY");
        rates.insert("USD", 2.0);
        rates
    }

    #[tokio::test]
    async fn test_combined_table_keeps_catalog_order_and_reports_failures() {
        let calls = AtomicUsize::new(0);
        let combined = build_combined_table(&catalog(), &usd_rates(), &StubFetcher, &|| {
            calls.fetch_add(1, Ordering::SeqCst);
        })
        .await;

        let rows: Vec<_> = combined
            .table
            .iter()
            .map(|r| (r.item_name.as_str(), r.source.as_str(), r.price))
            .collect();
        assert_eq!(
            rows,
            vec![("Apollo", "A", 20.0), ("Apollo", "B", 40.0), ("Jeep", "A", 10.0)]
        );
        assert_eq!(calls.load(Ordering::SeqCst), 4);

        assert_eq!(combined.warnings.len(), 3);
        assert!(combined.warnings.iter().all(|w| !w.is_fatal()));
        assert!(combined.warnings[0].to_string().contains("Broken (2)"));
        assert!(combined.warnings[1].to_string().contains("no source lists"));
        assert_eq!(
            combined.warnings[2].to_string(),
            "Failed to fetch Jeep (4) from B: HTTP error: 503"
        );
    }

    #[tokio::test]
    async fn test_image_uses_unfiltered_table() {
        let combined = build_combined_table(&catalog(), &usd_rates(), &StubFetcher, &|| ()).await;
        assert_eq!(
            resolve_image(4, &combined.table, &TableImageResolver),
            ImageLookup::Available("https://img/4.png".to_string())
        );
        // Never fetched successfully
        assert_eq!(
            resolve_image(2, &combined.table, &TableImageResolver),
            ImageLookup::Unavailable
        );
        assert_eq!(
            resolve_image(1, &combined.table, &FailingResolver),
            ImageLookup::Unavailable
        );
    }
}
