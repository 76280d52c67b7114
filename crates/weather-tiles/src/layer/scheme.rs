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

//! Web Mercator tiling scheme.

use std::f64::consts::PI;

const EARTH_RADIUS_METERS: f64 = 6_378_137.0;
const INCHES_PER_METER: f64 = 39.37;

/// Square-tile Web Mercator grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WebMercator {
    /// Tile edge in pixels.
    pub tile_size: u32,
    /// Screen resolution used for map scale.
    pub dpi: f64,
}

impl Default for WebMercator {
    fn default() -> Self {
        Self {
            tile_size: 256,
            dpi: 96.0,
        }
    }
}

impl WebMercator {
    /// Ground resolution in meters per pixel at a zoom level.
    #[must_use]
    pub fn resolution(&self, zoom: u8) -> f64 {
        let world = 2.0 * PI * EARTH_RADIUS_METERS;
        world / (f64::from(self.tile_size) * 2_f64.powi(i32::from(zoom)))
    }

    /// Map scale denominator at a zoom level.
    #[must_use]
    pub fn zoom_to_scale(&self, zoom: u8) -> f64 {
        self.resolution(zoom) * self.dpi * INCHES_PER_METER
    }

    /// Tile column and row containing a point.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "clamped to the tile grid"
    )]
    pub fn tile_for(&self, lat: f64, lon: f64, zoom: u8) -> (u32, u32) {
        let n = 2_f64.powi(i32::from(zoom));
        let max = n - 1.0;
        let x = Self::lon_to_x(lon, zoom).floor().clamp(0.0, max);
        let y = Self::lat_to_y(lat, zoom).floor().clamp(0.0, max);
        (x as u32, y as u32)
    }

    /// Latitude to fractional tile row.
    #[must_use]
    pub fn lat_to_y(lat: f64, zoom: u8) -> f64 {
        let lat_rad = lat.to_radians();
        let n = 2_f64.powi(i32::from(zoom));
        let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0;
        y * n
    }

    /// Longitude to fractional tile column.
    #[must_use]
    pub fn lon_to_x(lon: f64, zoom: u8) -> f64 {
        let n = 2_f64.powi(i32::from(zoom));
        ((lon + 180.0) / 360.0) * n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_to_scale() {
        let scheme = WebMercator::default();
        assert!((scheme.zoom_to_scale(0) - 591_657_527.591_555).abs() < 1.0);
        // Each level halves the scale
        let ratio = scheme.zoom_to_scale(9) / scheme.zoom_to_scale(10);
        assert!((ratio - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_tile_for() {
        let scheme = WebMercator::default();
        assert_eq!(scheme.tile_for(0.0, 0.0, 1), (1, 1));
        assert_eq!(scheme.tile_for(85.0, -180.0, 3), (0, 0));
        // Points past the antimeridian or poles clamp to the grid
        assert_eq!(scheme.tile_for(-89.9, 180.0, 2), (3, 3));
    }
}
