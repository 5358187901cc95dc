use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::{fs, path::PathBuf};
use tracing::debug;

/// A Lego set to track, identified by its catalog number.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CatalogItem {
    pub name: String,
    pub id: u32,
}

/// A retail website serving a JSON price document per set.
///
/// `url` must contain an `{id}` placeholder for the catalog number.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
    pub currency: String,
}

impl SourceConfig {
    pub fn url_for(&self, item_id: u32) -> String {
        self.url.replace("{id}", &item_id.to_string())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct YahooProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub yahoo: Option<YahooProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            yahoo: Some(YahooProviderConfig {
                base_url: "https://query1.finance.yahoo.com".to_string(),
            }),
        }
    }
}

fn default_request_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub base_currency: String,
    #[serde(default)]
    pub currencies: Vec<String>,
    pub catalog: Vec<CatalogItem>,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "brickprice", "brickprice")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_currency.trim().is_empty() {
            bail!("base_currency must not be empty");
        }
        if self.catalog.is_empty() {
            bail!("catalog must list at least one set");
        }

        let mut names = HashSet::new();
        let mut ids = HashSet::new();
        for item in &self.catalog {
            if !names.insert(item.name.as_str()) {
                bail!("Duplicate catalog name: {}", item.name);
            }
            if !ids.insert(item.id) {
                bail!("Duplicate catalog id: {}", item.id);
            }
        }

        let mut sources = HashSet::new();
        for source in &self.sources {
            if !sources.insert(source.name.as_str()) {
                bail!("Duplicate source name: {}", source.name);
            }
            if !source.url.contains("{id}") {
                bail!("Source {} url has no {{id}} placeholder", source.name);
            }
        }
        Ok(())
    }

    /// Set names in catalog order.
    pub fn catalog_names(&self) -> Vec<String> {
        self.catalog.iter().map(|item| item.name.clone()).collect()
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|source| source.name.clone()).collect()
    }

    /// Configured currencies followed by any further source currencies,
    /// uppercased and without duplicates.
    pub fn rate_currencies(&self) -> Vec<String> {
        let mut currencies: Vec<String> = Vec::new();
        let configured = self.currencies.iter();
        let from_sources = self.sources.iter().map(|s| &s.currency);
        for code in configured.chain(from_sources) {
            let code = code.to_uppercase();
            if !currencies.contains(&code) {
                currencies.push(code);
            }
        }
        currencies
    }

    pub fn yahoo_base_url(&self) -> &str {
        self.providers
            .yahoo
            .as_ref()
            .map_or("https://query1.finance.yahoo.com", |p| &p.base_url)
    }
}
