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

//! Time-series weather tile layers.
//!
//! A [`WeatherTileLayer`] wraps one product of the inventory and derives the
//! tile URL template for its currently selected timestamp. Observed products
//! step through their series of timestamps; forecast products stay on their
//! most recent issue time and step through its forecast valid times.
//!
//! The selection is a small immutable [`Selection`] value. Every transition
//! produces a new selection, and the URL template is recomputed from it by
//! [`compute_url_template`] before the transition returns.

pub mod scheme;

pub use scheme::WebMercator;

use chrono::{DateTime, Utc};
use log::debug;
use uuid::Uuid;

use crate::catalog::{is_forecast_name, SeriesEntry, SeriesInfo};
use crate::error::WeatherError;

/// Attribution shown for weather tiles.
pub const DEFAULT_COPYRIGHT: &str = "The Weather Company";

/// How often the server publishes new tiles, in minutes.
pub const DEFAULT_UPDATE_FREQUENCY_MINUTES: f64 = 5.0;

/// Kind of product, fixed by its name when the layer is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    /// Observed product: one tile set per timestamp.
    Observed,
    /// Forecast product: one tile set per forecast valid time.
    Forecast,
}

impl LayerKind {
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        if is_forecast_name(name) {
            LayerKind::Forecast
        } else {
            LayerKind::Observed
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            LayerKind::Observed => "observed",
            LayerKind::Forecast => "forecast",
        }
    }
}

/// Position within a layer's series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Index into the series.
    Observed { ts_index: usize },
    /// Index into the series plus index into that entry's forecast times.
    Forecast { ts_index: usize, fts_index: usize },
}

impl Selection {
    /// Most recent position for a kind of layer.
    #[must_use]
    pub fn initial(kind: LayerKind) -> Self {
        match kind {
            LayerKind::Observed => Selection::Observed { ts_index: 0 },
            LayerKind::Forecast => Selection::Forecast {
                ts_index: 0,
                fts_index: 0,
            },
        }
    }

    /// The index stepped by the time slider.
    #[must_use]
    pub fn step_index(&self) -> usize {
        match *self {
            Selection::Observed { ts_index } => ts_index,
            Selection::Forecast { fts_index, .. } => fts_index,
        }
    }

    /// Number of slider steps available from this position.
    #[must_use]
    pub fn step_count(&self, series: &[SeriesEntry]) -> usize {
        match *self {
            Selection::Observed { .. } => series.len(),
            Selection::Forecast { ts_index, .. } => {
                series.get(ts_index).map_or(0, |entry| entry.fts.len())
            }
        }
    }

    /// The position with the slider at `index`, or `None` when out of range.
    #[must_use]
    pub fn select(self, index: usize, series: &[SeriesEntry]) -> Option<Self> {
        if index >= self.step_count(series) {
            return None;
        }
        Some(match self {
            Selection::Observed { .. } => Selection::Observed { ts_index: index },
            Selection::Forecast { ts_index, .. } => Selection::Forecast {
                ts_index,
                fts_index: index,
            },
        })
    }

    /// Timestamp and forecast time at this position.
    #[must_use]
    pub fn resolve(&self, series: &[SeriesEntry]) -> Option<(i64, Option<i64>)> {
        match *self {
            Selection::Observed { ts_index } => series.get(ts_index).map(|entry| (entry.ts, None)),
            Selection::Forecast {
                ts_index,
                fts_index,
            } => {
                let entry = series.get(ts_index)?;
                let fts = entry.fts.get(fts_index)?;
                Some((entry.ts, Some(*fts)))
            }
        }
    }
}

/// Inputs of a tile URL template.
#[derive(Debug, Clone, Copy)]
pub struct TemplateParams<'a> {
    pub base_url: &'a str,
    pub layer_name: &'a str,
    pub api_key: &'a str,
    pub ts: i64,
    pub fts: Option<i64>,
}

/// Tile URL template with `{col}`, `{row}` and `{level}` placeholders.
#[must_use]
pub fn compute_url_template(params: &TemplateParams<'_>) -> String {
    let TemplateParams {
        base_url,
        layer_name,
        api_key,
        ts,
        fts,
    } = *params;

    match fts {
        Some(fts) => format!(
            "https://{base_url}/v3/TileServer/tile/{layer_name}?ts={ts}&fts={fts}&xyz={{col}}:{{row}}:{{level}}&apiKey={api_key}"
        ),
        None => format!(
            "https://{base_url}/v3/TileServer/tile/{layer_name}?ts={ts}&xyz={{col}}:{{row}}:{{level}}&apiKey={api_key}"
        ),
    }
}

/// Format an epoch-seconds timestamp for display.
#[must_use]
pub fn format_timestamp(epoch_secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(epoch_secs, 0).map_or_else(
        || epoch_secs.to_string(),
        |time| time.format("%Y-%m-%d %H:%M UTC").to_string(),
    )
}

/// A weather product rendered as map tiles at a selectable timestamp.
#[derive(Debug, Clone)]
pub struct WeatherTileLayer {
    id: Uuid,
    info: SeriesInfo,
    api_key: String,
    base_url: String,
    kind: LayerKind,
    selection: Selection,
    ts: i64,
    fts: Option<i64>,
    url_template: String,
    max_scale: f64,
    /// Attribution text.
    pub copyright: String,
    /// Minutes between server updates.
    pub update_frequency: f64,
    /// Whether the layer shows in the legend.
    pub legend_enabled: bool,
}

impl WeatherTileLayer {
    /// Build a layer positioned on the most recent timestamp.
    ///
    /// Fails when the series has no timestamp to show (for forecast products,
    /// when the most recent entry has no forecast times).
    pub fn new(info: SeriesInfo, api_key: &str, base_url: &str) -> Result<Self, WeatherError> {
        let kind = LayerKind::from_name(&info.name);
        let selection = Selection::initial(kind);
        let (ts, fts) = selection
            .resolve(&info.series)
            .ok_or_else(|| WeatherError::EmptySeries(info.name.clone()))?;

        let max_scale = WebMercator::default().zoom_to_scale(info.max_zoom);

        let mut layer = Self {
            id: Uuid::new_v4(),
            info,
            api_key: api_key.to_string(),
            base_url: base_url.to_string(),
            kind,
            selection,
            ts,
            fts,
            url_template: String::new(),
            max_scale,
            copyright: DEFAULT_COPYRIGHT.to_string(),
            update_frequency: DEFAULT_UPDATE_FREQUENCY_MINUTES,
            legend_enabled: false,
        };
        layer.refresh_template();
        Ok(layer)
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn layer_name(&self) -> &str {
        &self.info.name
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.info.title
    }

    #[must_use]
    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    #[must_use]
    pub fn is_forecast(&self) -> bool {
        self.kind == LayerKind::Forecast
    }

    #[must_use]
    pub fn series_info(&self) -> &SeriesInfo {
        &self.info
    }

    #[must_use]
    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Selected timestamp, epoch seconds.
    #[must_use]
    pub fn ts(&self) -> i64 {
        self.ts
    }

    /// Selected forecast time, epoch seconds (forecast layers only).
    #[must_use]
    pub fn fts(&self) -> Option<i64> {
        self.fts
    }

    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Tile URL template for the current selection.
    #[must_use]
    pub fn url_template(&self) -> &str {
        &self.url_template
    }

    /// Smallest map scale denominator the layer draws at.
    #[must_use]
    pub fn max_scale(&self) -> f64 {
        self.max_scale
    }

    #[must_use]
    pub fn max_zoom(&self) -> u8 {
        self.info.max_zoom
    }

    #[must_use]
    pub fn native_zoom(&self) -> Option<u8> {
        self.info.native_zoom
    }

    /// Number of slider steps.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.selection.step_count(&self.info.series)
    }

    /// Current slider step.
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.selection.step_index()
    }

    /// Timestamp shown at a slider step, epoch seconds.
    #[must_use]
    pub fn timestamp_at(&self, index: usize) -> Option<i64> {
        let selection = self.selection.select(index, &self.info.series)?;
        let (ts, fts) = selection.resolve(&self.info.series)?;
        Some(fts.unwrap_or(ts))
    }

    /// Display label for a slider step, without changing the selection.
    #[must_use]
    pub fn label_at(&self, index: usize) -> Option<String> {
        self.timestamp_at(index).map(format_timestamp)
    }

    /// Display label for the current selection.
    #[must_use]
    pub fn current_label(&self) -> String {
        format_timestamp(self.fts.unwrap_or(self.ts))
    }

    /// Move the slider to `index`.
    ///
    /// Out-of-range indices are ignored. Returns whether the selection
    /// changed; the URL template is current when this returns.
    pub fn set_timestamp_index(&mut self, index: usize) -> bool {
        match self.selection.select(index, &self.info.series) {
            Some(next) if next != self.selection => self.apply(next),
            Some(_) => false,
            None => {
                debug!(
                    "Ignoring timestamp index {} for {} ({} steps)",
                    index,
                    self.info.name,
                    self.step_count()
                );
                false
            }
        }
    }

    /// Step the slider forward, wrapping to the first step after the last.
    pub fn advance(&mut self) -> bool {
        let count = self.step_count();
        if count == 0 {
            return false;
        }
        self.set_timestamp_index((self.current_index() + 1) % count)
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = api_key;
        self.refresh_template();
    }

    pub fn set_base_url(&mut self, base_url: String) {
        self.base_url = base_url;
        self.refresh_template();
    }

    /// URL of one tile at the current selection.
    #[must_use]
    pub fn tile_url(&self, col: u32, row: u32, level: u8) -> String {
        self.url_template
            .replace("{col}", &col.to_string())
            .replace("{row}", &row.to_string())
            .replace("{level}", &level.to_string())
    }

    fn apply(&mut self, selection: Selection) -> bool {
        let Some((ts, fts)) = selection.resolve(&self.info.series) else {
            return false;
        };
        self.selection = selection;
        self.ts = ts;
        self.fts = fts;
        self.refresh_template();
        true
    }

    fn refresh_template(&mut self) {
        self.url_template = compute_url_template(&TemplateParams {
            base_url: &self.base_url,
            layer_name: &self.info.name,
            api_key: &self.api_key,
            ts: self.ts,
            fts: self.fts,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observed_layer() -> WeatherTileLayer {
        let info = SeriesInfo::new(
            "temp",
            12,
            vec![
                SeriesEntry::observed(300),
                SeriesEntry::observed(200),
                SeriesEntry::observed(100),
            ],
        );
        WeatherTileLayer::new(info, "KEY", "api.weather.com").unwrap()
    }

    fn forecast_layer() -> WeatherTileLayer {
        let info = SeriesInfo::new(
            "tempFcst",
            10,
            vec![SeriesEntry::forecast(500, vec![50, 40, 30])],
        );
        WeatherTileLayer::new(info, "KEY", "api.weather.com").unwrap()
    }

    #[test]
    fn test_kind_from_name() {
        assert_eq!(LayerKind::from_name("temp"), LayerKind::Observed);
        assert_eq!(LayerKind::from_name("windSpeedFcst"), LayerKind::Forecast);
    }

    #[test]
    fn test_observed_initial_state() {
        let layer = observed_layer();
        assert!(!layer.is_forecast());
        assert_eq!(layer.ts(), 300);
        assert_eq!(layer.fts(), None);
        assert_eq!(layer.current_index(), 0);
        assert_eq!(layer.step_count(), 3);
        assert_eq!(
            layer.url_template(),
            "https://api.weather.com/v3/TileServer/tile/temp?ts=300&xyz={col}:{row}:{level}&apiKey=KEY"
        );
    }

    #[test]
    fn test_observed_set_timestamp_index() {
        let mut layer = observed_layer();
        assert!(layer.set_timestamp_index(1));
        assert_eq!(layer.ts(), 200);
        assert!(layer.url_template().contains("ts=200"));
        assert!(!layer.url_template().contains("fts="));
    }

    #[test]
    fn test_forecast_initial_state() {
        let layer = forecast_layer();
        assert!(layer.is_forecast());
        assert_eq!(layer.ts(), 500);
        assert_eq!(layer.fts(), Some(50));
        assert_eq!(layer.step_count(), 3);
        assert_eq!(
            layer.url_template(),
            "https://api.weather.com/v3/TileServer/tile/tempFcst?ts=500&fts=50&xyz={col}:{row}:{level}&apiKey=KEY"
        );
    }

    #[test]
    fn test_forecast_set_timestamp_index() {
        let mut layer = forecast_layer();
        assert!(layer.set_timestamp_index(2));
        assert_eq!(layer.fts(), Some(30));
        assert_eq!(layer.ts(), 500);
        assert_eq!(
            layer.selection(),
            Selection::Forecast {
                ts_index: 0,
                fts_index: 2
            }
        );
        assert!(layer.url_template().contains("ts=500&fts=30"));
    }

    #[test]
    fn test_out_of_range_index_ignored() {
        let mut layer = observed_layer();
        layer.set_timestamp_index(2);
        let before = layer.url_template().to_string();

        assert!(!layer.set_timestamp_index(3));
        assert!(!layer.set_timestamp_index(usize::MAX));
        assert_eq!(layer.ts(), 100);
        assert_eq!(layer.url_template(), before);

        let mut layer = forecast_layer();
        assert!(!layer.set_timestamp_index(3));
        assert_eq!(layer.fts(), Some(50));
    }

    #[test]
    fn test_same_index_is_not_a_change() {
        let mut layer = observed_layer();
        assert!(!layer.set_timestamp_index(0));
        assert_eq!(layer.ts(), 300);
    }

    #[test]
    fn test_advance_wraps() {
        let mut layer = observed_layer();
        assert!(layer.advance());
        assert!(layer.advance());
        assert_eq!(layer.current_index(), 2);
        assert!(layer.advance());
        assert_eq!(layer.current_index(), 0);
        assert_eq!(layer.ts(), 300);
    }

    #[test]
    fn test_single_step_series_never_advances() {
        let info = SeriesInfo::new("uv", 8, vec![SeriesEntry::observed(42)]);
        let mut layer = WeatherTileLayer::new(info, "KEY", "api.weather.com").unwrap();
        assert!(!layer.advance());
        assert_eq!(layer.ts(), 42);
    }

    #[test]
    fn test_empty_series_fails_construction() {
        let info = SeriesInfo::new("temp", 12, Vec::new());
        assert!(matches!(
            WeatherTileLayer::new(info, "KEY", "api.weather.com"),
            Err(WeatherError::EmptySeries(name)) if name == "temp"
        ));

        let info = SeriesInfo::new("tempFcst", 12, vec![SeriesEntry::forecast(500, Vec::new())]);
        assert!(WeatherTileLayer::new(info, "KEY", "api.weather.com").is_err());
    }

    #[test]
    fn test_dependency_changes_recompute_template() {
        let mut layer = observed_layer();
        layer.set_api_key("OTHER".to_string());
        assert!(layer.url_template().ends_with("apiKey=OTHER"));

        layer.set_base_url("tiles.example.com".to_string());
        assert!(layer
            .url_template()
            .starts_with("https://tiles.example.com/v3/TileServer/tile/temp?"));
    }

    #[test]
    fn test_tile_url() {
        let mut layer = forecast_layer();
        layer.set_timestamp_index(1);
        assert_eq!(
            layer.tile_url(3, 5, 4),
            "https://api.weather.com/v3/TileServer/tile/tempFcst?ts=500&fts=40&xyz=3:5:4&apiKey=KEY"
        );
    }

    #[test]
    fn test_labels() {
        let info = SeriesInfo::new(
            "radar",
            12,
            vec![
                SeriesEntry::observed(1_700_000_000),
                SeriesEntry::observed(1_699_999_400),
            ],
        );
        let layer = WeatherTileLayer::new(info, "KEY", "api.weather.com").unwrap();
        assert_eq!(layer.label_at(0).as_deref(), Some("2023-11-14 22:13 UTC"));
        assert_eq!(layer.label_at(1).as_deref(), Some("2023-11-14 22:03 UTC"));
        assert_eq!(layer.label_at(2), None);
        assert_eq!(layer.current_label(), "2023-11-14 22:13 UTC");
        // Previewing a label leaves the selection alone
        assert_eq!(layer.current_index(), 0);
    }

    #[test]
    fn test_forecast_timestamp_at_uses_forecast_times() {
        let layer = forecast_layer();
        assert_eq!(layer.timestamp_at(0), Some(50));
        assert_eq!(layer.timestamp_at(2), Some(30));
    }

    #[test]
    fn test_layer_attributes() {
        let layer = observed_layer();
        assert_eq!(layer.copyright, "The Weather Company");
        assert!((layer.update_frequency - 5.0).abs() < f64::EPSILON);
        assert!(!layer.legend_enabled);
        assert_eq!(layer.title(), "Temperature");
        assert_eq!(layer.max_zoom(), 12);
        let expected = WebMercator::default().zoom_to_scale(12);
        assert!((layer.max_scale() - expected).abs() < f64::EPSILON);
    }
}
