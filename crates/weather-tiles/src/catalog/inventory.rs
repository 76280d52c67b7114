// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Remote series inventory and layer construction.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use log::{error, info, warn};

use super::{parse_series_response, Catalog};
use crate::cors;
use crate::error::WeatherError;
use crate::layer::WeatherTileLayer;

/// Default weather tile server host.
pub const DEFAULT_BASE_URL: &str = "api.weather.com";

const SERIES_PATH: &str = "/v3/TileServer/series/productSet/PPAcore";

/// Configuration for an [`Inventory`].
#[derive(Debug, Clone)]
pub struct InventoryConfig {
    /// Tile server host, without scheme.
    pub base_url: String,
    /// API key sent with the inventory request and embedded in tile URLs.
    pub api_key: String,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
        }
    }
}

/// Fetch and parse the series inventory for one API key.
///
/// Performs a single GET with no retry.
pub async fn fetch_series(
    client: &reqwest::Client,
    base_url: &str,
    api_key: &str,
) -> Result<Catalog, WeatherError> {
    let url = format!("https://{base_url}{SERIES_PATH}");
    let response = client
        .get(&url)
        .query(&[("apiKey", api_key)])
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(WeatherError::Status(response.status().as_u16()));
    }

    let body = response.bytes().await?;
    parse_series_response(&body)
}

/// Series inventory for the configured API key.
///
/// Catalogs are cached per API key: once a key's inventory has been
/// published, later fetches for that key return it without a request.
pub struct Inventory {
    config: InventoryConfig,
    client: reqwest::Client,
    catalogs: RwLock<HashMap<String, Arc<Catalog>>>,
}

impl std::fmt::Debug for Inventory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inventory")
            .field("base_url", &self.config.base_url)
            .field("loaded", &self.catalog().is_some())
            .finish_non_exhaustive()
    }
}

impl Inventory {
    #[must_use]
    pub fn new(config: InventoryConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            catalogs: RwLock::new(HashMap::new()),
        }
    }

    /// Use an existing HTTP client.
    #[must_use]
    pub fn with_client(config: InventoryConfig, client: reqwest::Client) -> Self {
        Self {
            config,
            client,
            catalogs: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.config.api_key
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Switch to another API key. Its catalog must be fetched before layers
    /// can be built, unless it was fetched earlier.
    pub fn set_api_key(&mut self, api_key: String) {
        self.config.api_key = api_key;
    }

    /// Fetch the catalog for the current API key.
    ///
    /// On failure the error is logged and returned, and the catalog stays
    /// unset.
    pub async fn fetch(&self) -> Result<Arc<Catalog>, WeatherError> {
        if let Some(catalog) = self.catalog() {
            return Ok(catalog);
        }

        if !cors::global().contains(&self.config.base_url) {
            warn!(
                "{} is not registered as a CORS-enabled server",
                self.config.base_url
            );
        }

        info!("Fetching weather series inventory from {}", self.config.base_url);
        match fetch_series(&self.client, &self.config.base_url, &self.config.api_key).await {
            Ok(catalog) => {
                info!("Weather series inventory loaded: {} layers", catalog.len());
                Ok(self.publish(catalog))
            }
            Err(e) => {
                error!("Weather series inventory failed: {}", e);
                Err(e)
            }
        }
    }

    /// Publish a catalog for the current API key, replacing any earlier one.
    pub fn publish(&self, catalog: Catalog) -> Arc<Catalog> {
        let catalog = Arc::new(catalog);
        if let Ok(mut catalogs) = self.catalogs.write() {
            catalogs.insert(self.config.api_key.clone(), Arc::clone(&catalog));
        }
        catalog
    }

    /// The catalog for the current API key, if loaded.
    #[must_use]
    pub fn catalog(&self) -> Option<Arc<Catalog>> {
        self.catalogs
            .read()
            .ok()
            .and_then(|catalogs| catalogs.get(&self.config.api_key).cloned())
    }

    /// Build a tile layer for a named product.
    pub fn try_weather_layer(&self, name: &str) -> Result<WeatherTileLayer, WeatherError> {
        let catalog = self.catalog().ok_or(WeatherError::CatalogNotLoaded)?;
        let info = catalog
            .get(name)
            .ok_or_else(|| WeatherError::UnknownLayer(name.to_string()))?;

        WeatherTileLayer::new(info.clone(), &self.config.api_key, &self.config.base_url)
    }

    /// Build a tile layer for a named product, or log why it can't be built.
    ///
    /// `None` means there is nothing to add to the map.
    #[must_use]
    pub fn get_weather_layer(&self, name: &str) -> Option<WeatherTileLayer> {
        match self.try_weather_layer(name) {
            Ok(layer) => Some(layer),
            Err(e) => {
                error!("Can't generate weather layer '{}': {}", name, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{SeriesEntry, SeriesInfo};

    fn inventory(api_key: &str) -> Inventory {
        Inventory::new(InventoryConfig {
            api_key: api_key.to_string(),
            ..Default::default()
        })
    }

    fn sample_catalog() -> Catalog {
        vec![
            SeriesInfo::new(
                "temp",
                12,
                vec![SeriesEntry::observed(300), SeriesEntry::observed(200)],
            ),
            SeriesInfo::new("radar", 10, Vec::new()),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_defaults() {
        let inventory = inventory("key");
        assert_eq!(inventory.base_url(), "api.weather.com");
        assert!(inventory.catalog().is_none());
    }

    #[test]
    fn test_layer_before_catalog_loaded() {
        let inventory = inventory("key");
        assert!(matches!(
            inventory.try_weather_layer("temp"),
            Err(WeatherError::CatalogNotLoaded)
        ));
        assert!(inventory.get_weather_layer("temp").is_none());
    }

    #[test]
    fn test_get_weather_layer() {
        let inventory = inventory("key");
        inventory.publish(sample_catalog());

        let layer = inventory.get_weather_layer("temp").unwrap();
        assert_eq!(layer.layer_name(), "temp");
        assert_eq!(layer.title(), "Temperature");
        assert_eq!(layer.ts(), 300);
        assert!(layer.url_template().contains("apiKey=key"));
    }

    #[test]
    fn test_unknown_layer() {
        let inventory = inventory("key");
        inventory.publish(sample_catalog());

        assert!(matches!(
            inventory.try_weather_layer("lightning"),
            Err(WeatherError::UnknownLayer(name)) if name == "lightning"
        ));
        assert!(inventory.get_weather_layer("lightning").is_none());
        // Known but empty series cannot produce a layer
        assert!(inventory.get_weather_layer("radar").is_none());
    }

    #[test]
    fn test_catalog_cached_per_api_key() {
        let mut inventory = inventory("first");
        inventory.publish(sample_catalog());
        assert!(inventory.catalog().is_some());

        inventory.set_api_key("second".to_string());
        assert!(inventory.catalog().is_none());

        inventory.set_api_key("first".to_string());
        assert_eq!(inventory.catalog().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_returns_cached_catalog() {
        let inventory = inventory("key");
        let published = inventory.publish(sample_catalog());

        // No request is made once the key's catalog is published
        let fetched = inventory.fetch().await.unwrap();
        assert!(Arc::ptr_eq(&published, &fetched));
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_catalog_unset() {
        let inventory = Inventory::new(InventoryConfig {
            base_url: "127.0.0.1:1".to_string(),
            api_key: "key".to_string(),
        });

        assert!(matches!(inventory.fetch().await, Err(WeatherError::Http(_))));
        assert!(inventory.catalog().is_none());
        assert!(inventory.get_weather_layer("temp").is_none());
    }
}
