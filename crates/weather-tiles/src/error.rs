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

//! Error type shared by the catalog and layer modules.

use thiserror::Error;

/// Errors raised while fetching the series inventory or building layers.
///
/// None of these are fatal to a host application: a failed fetch leaves the
/// catalog unset and an unknown layer simply yields nothing to add.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("series request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("series request returned HTTP {0}")]
    Status(u16),

    #[error("malformed series response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("layer '{0}' has no timestamps in its series")]
    EmptySeries(String),

    #[error("unknown weather layer '{0}'")]
    UnknownLayer(String),

    #[error("series catalog has not been loaded")]
    CatalogNotLoaded,
}
