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

//! Weather layer inventory catalog.
//!
//! The tile server publishes, per named weather product, the list of
//! timestamps for which tiles exist (and for forecast products, the forecast
//! offsets issued at each timestamp). This module parses that inventory into
//! a [`Catalog`] restricted to the products we know how to title.

mod inventory;

pub use inventory::{fetch_series, Inventory, InventoryConfig, DEFAULT_BASE_URL};

use std::collections::{BTreeMap, HashMap};

use log::{debug, warn};
use serde::Deserialize;

use crate::error::WeatherError;

/// Suffix marking a forecast product.
pub const FORECAST_SUFFIX: &str = "Fcst";

/// Recognized weather products and their display titles.
const WEATHER_LAYER_TITLES: [(&str, &str); 27] = [
    ("sat", "Satellite"),
    ("ussat", "US Satellite"),
    ("dewpoint", "Dewpoint"),
    ("feelsLike", "Feels Like"),
    ("precip24hr", "Precipitation 24 Hour"),
    ("rwi", "Road Weather Index"),
    ("satrad", "Satellite & Radar"),
    ("snow24hr", "Snow 24 Hour"),
    ("temp", "Temperature"),
    ("tempChange", "Temperature Change"),
    ("uv", "UltraViolet (UV)"),
    ("windSpeed", "Wind Speed"),
    ("radar", "Radar"),
    ("radarAustralian", "Radar Australia"),
    ("radarEurope", "Radar Europe"),
    ("euVisSat", "Europe - Visible Spectrum"),
    ("euIrSat", "Europe - Longwave  Infrared"),
    ("cloudsFcst", "Clouds Forecast"),
    ("dewpointFcst", "Dew Point Forecast"),
    ("feelsLikeFcst", "Feels Like Forecast"),
    ("precip24hrFcst", "Precipitation 24 Hour Forecast"),
    ("radarFcst", "Radar Forecast"),
    ("satradFcst", "Satellite & Radar Forecast"),
    ("snow24hrFcst", "Snow 24 Hour Forecast"),
    ("tempFcst", "Temperature Forecast"),
    ("uvFcst", "UltraViolet (UV) Forecast"),
    ("windSpeedFcst", "Wind Speed Forecast"),
];

/// Look up the display title of a recognized weather product.
#[must_use]
pub fn layer_title(name: &str) -> Option<&'static str> {
    WEATHER_LAYER_TITLES
        .iter()
        .find(|(layer_name, _)| *layer_name == name)
        .map(|(_, title)| *title)
}

/// Whether a product name denotes a forecast product.
#[must_use]
pub fn is_forecast_name(name: &str) -> bool {
    name.ends_with(FORECAST_SUFFIX)
}

/// One timestamp of a layer's series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesEntry {
    /// Issue/observation time in epoch seconds.
    pub ts: i64,
    /// Forecast valid times in epoch seconds (forecast products only).
    pub fts: Vec<i64>,
}

impl SeriesEntry {
    /// Entry of an observed (non-forecast) product.
    #[must_use]
    pub fn observed(ts: i64) -> Self {
        Self { ts, fts: Vec::new() }
    }

    /// Entry of a forecast product.
    #[must_use]
    pub fn forecast(ts: i64, fts: Vec<i64>) -> Self {
        Self { ts, fts }
    }
}

/// Series metadata for one weather product.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesInfo {
    /// Product identifier, e.g. `temp` or `tempFcst`.
    pub name: String,
    /// Human readable title.
    pub title: String,
    /// Deepest zoom level the product is rendered at.
    pub max_zoom: u8,
    /// Zoom level the product is natively produced at, when published.
    pub native_zoom: Option<u8>,
    /// Timestamps, most recent first.
    pub series: Vec<SeriesEntry>,
}

impl SeriesInfo {
    /// Build series info whose title comes from the product table, falling
    /// back to the name for unrecognized products.
    #[must_use]
    pub fn new(name: &str, max_zoom: u8, series: Vec<SeriesEntry>) -> Self {
        Self {
            name: name.to_string(),
            title: layer_title(name).unwrap_or(name).to_string(),
            max_zoom,
            native_zoom: None,
            series,
        }
    }

    /// Whether this is a forecast product.
    #[must_use]
    pub fn is_forecast(&self) -> bool {
        is_forecast_name(&self.name)
    }

    /// The most recent entry of the series.
    #[must_use]
    pub fn latest(&self) -> Option<&SeriesEntry> {
        self.series.first()
    }
}

/// Recognized weather products keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    layers: BTreeMap<String, SeriesInfo>,
}

impl Catalog {
    /// Look up a product by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SeriesInfo> {
        self.layers.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.layers.contains_key(name)
    }

    /// Product names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }

    /// Products in name order.
    pub fn iter(&self) -> impl Iterator<Item = &SeriesInfo> {
        self.layers.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// An empty catalog is a valid state meaning "no layers available".
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl FromIterator<SeriesInfo> for Catalog {
    fn from_iter<I: IntoIterator<Item = SeriesInfo>>(iter: I) -> Self {
        Self {
            layers: iter
                .into_iter()
                .map(|info| (info.name.clone(), info))
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeriesResponse {
    series_info: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSeriesInfo {
    max_zoom: u8,
    #[serde(default)]
    native_zoom: Option<u8>,
    #[serde(default)]
    series: Vec<RawSeriesEntry>,
}

#[derive(Debug, Deserialize)]
struct RawSeriesEntry {
    ts: i64,
    #[serde(default)]
    fts: Vec<i64>,
}

/// Parse a series inventory response body.
///
/// Products missing from the title table are dropped before their entries are
/// decoded. A recognized product whose entry can't be decoded is skipped with
/// a warning; only an unreadable body fails the whole catalog.
/// The server lists timestamps oldest first; every series (and every forecast
/// list) is reversed so index 0 is the most recent.
pub fn parse_series_response(body: &[u8]) -> Result<Catalog, WeatherError> {
    let response: SeriesResponse = serde_json::from_slice(body)?;

    let mut layers = BTreeMap::new();
    for (name, value) in response.series_info {
        let Some(title) = layer_title(&name) else {
            debug!("Skipping unrecognized weather layer '{}'", name);
            continue;
        };

        let raw: RawSeriesInfo = match serde_json::from_value(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Skipping malformed weather layer '{}': {}", name, e);
                continue;
            }
        };
        let series = raw
            .series
            .into_iter()
            .rev()
            .map(|entry| {
                let mut fts = entry.fts;
                fts.reverse();
                SeriesEntry { ts: entry.ts, fts }
            })
            .collect();

        layers.insert(
            name.clone(),
            SeriesInfo {
                name,
                title: title.to_string(),
                max_zoom: raw.max_zoom,
                native_zoom: raw.native_zoom,
                series,
            },
        );
    }

    Ok(Catalog { layers })
}
