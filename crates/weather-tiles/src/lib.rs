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

//! Weather tile series library.
//!
//! Browses the weather products published by a tile-series server and turns
//! them into time-series tile layers:
//!
//! - **Catalog layer**: fetches the series inventory and keeps the products
//!   with a known title ([`Inventory`], [`Catalog`], [`SeriesInfo`])
//! - **Layer layer**: one product at a selected timestamp, with its tile URL
//!   template derived from the selection ([`WeatherTileLayer`])
//! - **Map layer**: layers added to a map, each with at most one playback
//!   timer stepping it through time ([`WeatherMap`], [`Playback`])
//!
//! # Quick Start
//!
//! ```no_run
//! use weather_tiles::{cors, Inventory, InventoryConfig, WeatherMap};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let config = InventoryConfig {
//!         api_key: "my-api-key".to_string(),
//!         ..Default::default()
//!     };
//!     cors::global().register(&config.base_url);
//!
//!     let inventory = Inventory::new(config);
//!     if inventory.fetch().await.is_err() {
//!         return;
//!     }
//!
//!     let mut map = WeatherMap::default();
//!     if let Some(layer) = inventory.get_weather_layer("radar") {
//!         let id = layer.id();
//!         map.add(layer);
//!         map.set_timestamp_index(id, 3);
//!         map.start_playback(id);
//!     }
//! }
//! ```
//!
//! # Using a Layer Directly
//!
//! ```
//! use weather_tiles::{SeriesEntry, SeriesInfo, WeatherTileLayer};
//!
//! let info = SeriesInfo::new(
//!     "temp",
//!     12,
//!     vec![SeriesEntry::observed(300), SeriesEntry::observed(200)],
//! );
//! let mut layer = WeatherTileLayer::new(info, "KEY", "api.weather.com").unwrap();
//!
//! layer.set_timestamp_index(1);
//! assert_eq!(layer.ts(), 200);
//! assert_eq!(
//!     layer.tile_url(1, 2, 3),
//!     "https://api.weather.com/v3/TileServer/tile/temp?ts=200&xyz=1:2:3&apiKey=KEY"
//! );
//! ```

pub mod catalog;
pub mod cors;
pub mod error;
pub mod layer;
pub mod map;
pub mod playback;

pub use catalog::{
    fetch_series, layer_title, parse_series_response, Catalog, Inventory, InventoryConfig,
    SeriesEntry, SeriesInfo, DEFAULT_BASE_URL,
};
pub use error::WeatherError;
pub use layer::{
    compute_url_template, LayerKind, Selection, TemplateParams, WeatherTileLayer, WebMercator,
};
pub use map::{MapConfig, WeatherMap};
pub use playback::{LayerEvent, Playback, SharedLayer, DEFAULT_PLAY_INTERVAL};
