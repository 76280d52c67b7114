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

//! Application configuration management.
//!
//! Configuration is stored as TOML through `confy`. The weather API key may
//! also come from the environment, which takes precedence over the file.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use weather_tiles::DEFAULT_BASE_URL;

const APP_NAME: &str = "weather-viewer";
const CONFIG_NAME: &str = "config";

/// Environment variable holding the weather API key.
pub const API_KEY_ENV: &str = "WEATHER_API_KEY";

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Configuration schema version for migrations
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    /// Weather tile API key (optional, env var takes precedence)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Weather tile server host
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Seconds between playback steps
    #[serde(default = "default_play_interval_secs")]
    pub play_interval_secs: f64,

    /// Layer used when none is named on the command line
    #[serde(default = "default_layer")]
    pub default_layer: String,
}

fn default_config_version() -> u32 {
    1
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_play_interval_secs() -> f64 {
    2.0
}

fn default_layer() -> String {
    "radar".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            api_key: None,
            base_url: default_base_url(),
            play_interval_secs: default_play_interval_secs(),
            default_layer: default_layer(),
        }
    }
}

impl AppConfig {
    /// Load configuration from disk, creating it with defaults if missing
    pub fn load() -> Result<Self, confy::ConfyError> {
        confy::load(APP_NAME, CONFIG_NAME)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), confy::ConfyError> {
        confy::store(APP_NAME, CONFIG_NAME, self)
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<std::path::PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
    }

    /// Resolve the API key from the environment, then this config
    #[must_use]
    pub fn resolve_api_key(&self) -> Option<String> {
        resolve_api_key(std::env::var(API_KEY_ENV).ok(), self.api_key.as_deref())
    }

    /// Where the resolved API key came from, for display
    #[must_use]
    pub fn api_key_source(&self) -> Option<&'static str> {
        if std::env::var(API_KEY_ENV).is_ok_and(|k| !k.is_empty()) {
            Some("environment variable")
        } else if self.api_key.as_deref().is_some_and(|k| !k.is_empty()) {
            Some("config file")
        } else {
            None
        }
    }

    /// Playback period, falling back to the default for unusable values
    #[must_use]
    pub fn play_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.play_interval_secs)
            .ok()
            .filter(|d| !d.is_zero())
            .unwrap_or_else(|| Duration::from_secs_f64(default_play_interval_secs()))
    }
}

fn resolve_api_key(env_key: Option<String>, config_key: Option<&str>) -> Option<String> {
    env_key
        .filter(|k| !k.is_empty())
        .or_else(|| config_key.map(str::to_string).filter(|k| !k.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.base_url, "api.weather.com");
        assert_eq!(config.play_interval(), Duration::from_secs(2));
        assert_eq!(config.default_layer, "radar");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: AppConfig = toml::from_str("api_key = \"abc\"").unwrap();
        assert_eq!(config.api_key.as_deref(), Some("abc"));
        assert_eq!(config.base_url, "api.weather.com");
        assert_eq!(config.config_version, 1);
    }

    #[test]
    fn test_api_key_precedence() {
        assert_eq!(
            resolve_api_key(Some("env".to_string()), Some("file")).as_deref(),
            Some("env")
        );
        assert_eq!(
            resolve_api_key(Some(String::new()), Some("file")).as_deref(),
            Some("file")
        );
        assert_eq!(resolve_api_key(None, Some("")), None);
        assert_eq!(resolve_api_key(None, None), None);
    }

    #[test]
    fn test_invalid_play_interval_falls_back() {
        let config = AppConfig {
            play_interval_secs: -1.0,
            ..Default::default()
        };
        assert_eq!(config.play_interval(), Duration::from_secs(2));

        let config = AppConfig {
            play_interval_secs: 0.5,
            ..Default::default()
        };
        assert_eq!(config.play_interval(), Duration::from_millis(500));
    }
}
