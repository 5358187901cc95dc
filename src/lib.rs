pub mod cli;
pub mod core;
pub mod providers;

use crate::core::config::AppConfig;
use crate::core::dashboard::{self, DashboardData};
use crate::core::filter::{ViewState, apply_view};
use crate::core::image::TableImageResolver;
use crate::core::{DashboardError, currency};
use crate::providers::caching::{CachingCurrencyRateProvider, CachingPriceFetcher, FetchCache};
use crate::providers::retailer::RetailerPriceFetcher;
use crate::providers::yahoo_finance::YahooCurrencyProvider;
use anyhow::Result;
use cli::dashboard::{RenderOptions, rates_table, render_page};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub enum AppCommand {
    Rates,
    Show(ShowOptions),
    Interactive,
}

#[derive(Debug, Clone, Default)]
pub struct ShowOptions {
    pub view: ViewState,
    pub show_images: bool,
}

/// Configured providers sharing one fetch cache.
pub struct App {
    pub config: AppConfig,
    pub cache: FetchCache,
    pub rate_provider: CachingCurrencyRateProvider<YahooCurrencyProvider>,
    pub fetcher: CachingPriceFetcher<RetailerPriceFetcher>,
    pub resolver: TableImageResolver,
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self> {
        let cache = FetchCache::new();
        let rate_provider = CachingCurrencyRateProvider::new(
            YahooCurrencyProvider::new(config.yahoo_base_url(), config.request_timeout_secs)?,
            Arc::clone(&cache.rates),
        );
        let fetcher = CachingPriceFetcher::new(
            RetailerPriceFetcher::new(config.sources.clone(), config.request_timeout_secs)?,
            Arc::clone(&cache.prices),
        );

        Ok(Self {
            config,
            cache,
            rate_provider,
            fetcher,
            resolver: TableImageResolver,
        })
    }

    /// Fetches rates and the combined table, showing progress per set.
    pub async fn load(&self) -> Result<DashboardData, DashboardError> {
        let pb = cli::ui::new_progress_bar(self.config.catalog.len() as u64, true);
        pb.set_message("Fetching prices...");
        let result =
            dashboard::load_dashboard(&self.config, &self.rate_provider, &self.fetcher, &|| {
                pb.inc(1)
            })
            .await;
        pb.finish_and_clear();
        result
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Lego price dashboard starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let app = App::new(config)?;

    match command {
        AppCommand::Rates => {
            let rates = currency::fetch_rates(
                &app.rate_provider,
                &app.config.rate_currencies(),
                &app.config.base_currency,
            )
            .await?;
            println!("{}", rates_table(&rates));
        }
        AppCommand::Show(options) => {
            let view_state = options
                .view
                .resolve_names(&app.config.catalog_names(), &app.config.source_names())?;
            let data = app.load().await?;
            let view = apply_view(&data.combined, &app.config.catalog_names(), &view_state);
            let render_options = RenderOptions {
                show_images: options.show_images,
                ..RenderOptions::default()
            };
            println!(
                "{}",
                render_page(&app.config, &data, &view, &app.resolver, &render_options)
            );
        }
        AppCommand::Interactive => cli::interactive::run(&app).await?,
    }

    Ok(())
}
