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

//! Command line viewer for weather tile series.

mod config;

use std::error::Error;
use std::time::Duration;

use clap::{Parser, Subcommand};
use log::{error, info, warn};
use mimalloc::MiMalloc;
use weather_tiles::{
    cors, Inventory, InventoryConfig, LayerEvent, MapConfig, WeatherMap, WeatherTileLayer,
    WebMercator,
};

use config::{AppConfig, API_KEY_ENV};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser, Debug)]
#[command(name = "weather-viewer", version, about = "Browse and play weather tile series")]
struct Cli {
    /// API key (overrides environment and config file)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Tile server host (overrides config file)
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the weather layers available for the API key
    Layers,

    /// Print the tile URL template of a layer
    Template {
        /// Layer name, e.g. `radar` or `tempFcst`
        layer: Option<String>,

        /// Slider position to select before printing
        #[arg(long)]
        index: Option<usize>,

        /// Also resolve the tile containing this latitude
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        /// Also resolve the tile containing this longitude
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,

        /// Zoom level of the resolved tile
        #[arg(long, default_value_t = 4)]
        level: u8,
    },

    /// Step a layer through its series, printing each template
    Play {
        /// Layer name, e.g. `radar` or `tempFcst`
        layer: Option<String>,

        /// Number of steps before the layer is removed
        #[arg(long, default_value_t = 10)]
        steps: usize,

        /// Seconds between steps (overrides config file)
        #[arg(long)]
        interval: Option<f64>,
    },

    /// Show or update the configuration file
    Config {
        /// Store an API key in the config file
        #[arg(long)]
        set_api_key: Option<String>,

        /// Store a default layer in the config file
        #[arg(long)]
        set_default_layer: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut config = AppConfig::load()?;

    let command = match cli.command {
        Command::Config {
            set_api_key,
            set_default_layer,
        } => return run_config(config, set_api_key, set_default_layer),
        command => command,
    };

    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }

    let api_key = cli
        .api_key
        .or_else(|| config.resolve_api_key())
        .ok_or_else(|| {
            format!(
                "no API key: pass --api-key, set {API_KEY_ENV} or run `config --set-api-key`"
            )
        })?;

    cors::global().register(&config.base_url);

    let inventory = Inventory::new(InventoryConfig {
        base_url: config.base_url.clone(),
        api_key,
    });
    let catalog = inventory.fetch().await?;

    match command {
        Command::Layers => {
            if catalog.is_empty() {
                println!("No weather layers available");
            }
            for info in catalog.iter() {
                let kind = if info.is_forecast() { "forecast" } else { "observed" };
                println!(
                    "{:<16} {:<34} {:<9} {:>3} steps  max zoom {}",
                    info.name,
                    info.title,
                    kind,
                    info.series.len(),
                    info.max_zoom
                );
            }
        }
        Command::Template {
            layer,
            index,
            lat,
            lon,
            level,
        } => {
            let name = layer.unwrap_or_else(|| config.default_layer.clone());
            let mut layer = build_layer(&inventory, &name)?;
            if let Some(index) = index {
                if !layer.set_timestamp_index(index) && index != layer.current_index() {
                    warn!(
                        "Index {} is outside 0..{}, keeping the current timestamp",
                        index,
                        layer.step_count()
                    );
                }
            }
            print_layer(&layer);
            if let (Some(lat), Some(lon)) = (lat, lon) {
                let (col, row) = WebMercator::default().tile_for(lat, lon, level);
                println!("tile:     {}", layer.tile_url(col, row, level));
            }
        }
        Command::Play {
            layer,
            steps,
            interval,
        } => {
            let name = layer.unwrap_or_else(|| config.default_layer.clone());
            let layer = build_layer(&inventory, &name)?;
            let play_interval = interval
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                .filter(|d| !d.is_zero())
                .unwrap_or_else(|| config.play_interval());
            play(layer, steps, play_interval).await;
        }
        Command::Config { .. } => {}
    }

    Ok(())
}

fn run_config(
    mut config: AppConfig,
    set_api_key: Option<String>,
    set_default_layer: Option<String>,
) -> Result<(), Box<dyn Error>> {
    let changed = set_api_key.is_some() || set_default_layer.is_some();
    if let Some(api_key) = set_api_key {
        config.api_key = Some(api_key);
    }
    if let Some(layer) = set_default_layer {
        config.default_layer = layer;
    }
    if changed {
        config.save()?;
        info!("Configuration saved");
    }

    println!("config file:   {}", AppConfig::get_config_path()?.display());
    println!("base url:      {}", config.base_url);
    println!("default layer: {}", config.default_layer);
    println!("play interval: {:?}", config.play_interval());
    println!(
        "api key:       {}",
        config.api_key_source().unwrap_or("not set")
    );
    Ok(())
}

fn build_layer(inventory: &Inventory, name: &str) -> Result<WeatherTileLayer, Box<dyn Error>> {
    inventory
        .get_weather_layer(name)
        .ok_or_else(|| format!("weather layer '{name}' is not available").into())
}

fn print_layer(layer: &WeatherTileLayer) {
    println!("layer:    {} ({})", layer.title(), layer.layer_name());
    println!("kind:     {}", layer.kind().label());
    println!(
        "step:     {}/{}  {}",
        layer.current_index() + 1,
        layer.step_count(),
        layer.current_label()
    );
    println!("template: {}", layer.url_template());
}

async fn play(layer: WeatherTileLayer, steps: usize, play_interval: Duration) {
    let mut map = WeatherMap::new(MapConfig {
        play_interval,
        ..Default::default()
    });
    let mut events = map.subscribe();

    let id = layer.id();
    let step_count = layer.step_count();
    let shared = map.add(layer);
    if let Ok(layer) = shared.read() {
        print_layer(&layer);
    }

    if step_count < 2 {
        warn!("Layer has a single timestamp, nothing to play");
        map.remove(id);
        return;
    }

    map.start_playback(id);

    let mut seen = 0;
    while seen < steps {
        match events.recv().await {
            Ok(LayerEvent::TemplateChanged { url_template, .. }) => {
                seen += 1;
                let label = shared
                    .read()
                    .map(|layer| layer.current_label())
                    .unwrap_or_default();
                println!("[{seen:>3}] {label}  {url_template}");
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Layer events interrupted: {}", e);
                break;
            }
        }
    }

    map.remove(id);
}
