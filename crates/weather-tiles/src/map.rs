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

//! Weather layers added to a map, with their playback timers.
//!
//! The map is the owner of playback: each layer has at most one running
//! timer, and removing a layer stops its timer before the layer is released.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use log::{info, warn};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::layer::WeatherTileLayer;
use crate::playback::{LayerEvent, Playback, SharedLayer, DEFAULT_PLAY_INTERVAL};

/// Configuration for a [`WeatherMap`].
#[derive(Debug, Clone)]
pub struct MapConfig {
    /// Time between playback steps.
    pub play_interval: Duration,
    /// Broadcast channel capacity for events.
    pub event_channel_capacity: usize,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            play_interval: DEFAULT_PLAY_INTERVAL,
            event_channel_capacity: 256,
        }
    }
}

struct MapEntry {
    id: Uuid,
    layer: SharedLayer,
    playback: Option<Playback>,
}

/// Ordered collection of weather layers on a map.
pub struct WeatherMap {
    entries: Vec<MapEntry>,
    play_interval: Duration,
    event_tx: broadcast::Sender<LayerEvent>,
}

impl std::fmt::Debug for WeatherMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherMap")
            .field("layer_count", &self.entries.len())
            .field("play_interval", &self.play_interval)
            .finish_non_exhaustive()
    }
}

impl Default for WeatherMap {
    fn default() -> Self {
        Self::new(MapConfig::default())
    }
}

impl WeatherMap {
    #[must_use]
    pub fn new(config: MapConfig) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_channel_capacity);
        Self {
            entries: Vec::new(),
            play_interval: config.play_interval,
            event_tx,
        }
    }

    /// Subscribe to layer events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<LayerEvent> {
        self.event_tx.subscribe()
    }

    /// Add a layer on top of the others.
    pub fn add(&mut self, layer: WeatherTileLayer) -> SharedLayer {
        let id = layer.id();
        info!("Adding weather layer {} ({})", layer.title(), id);

        let layer = Arc::new(RwLock::new(layer));
        self.entries.push(MapEntry {
            id,
            layer: Arc::clone(&layer),
            playback: None,
        });
        let _ = self.event_tx.send(LayerEvent::Added(id));
        layer
    }

    /// Remove a layer, stopping its playback first.
    pub fn remove(&mut self, id: Uuid) -> Option<SharedLayer> {
        let pos = self.position(id)?;
        let entry = self.entries.remove(pos);
        if let Some(playback) = entry.playback {
            playback.stop();
        }
        info!("Removed weather layer {}", id);
        let _ = self.event_tx.send(LayerEvent::Removed(id));
        Some(entry.layer)
    }

    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<SharedLayer> {
        self.entry(id).map(|entry| Arc::clone(&entry.layer))
    }

    /// Layer ids in drawing order.
    #[must_use]
    pub fn layer_ids(&self) -> Vec<Uuid> {
        self.entries.iter().map(|entry| entry.id).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Commit a slider position for a layer.
    ///
    /// Returns whether the layer's selection changed.
    pub fn set_timestamp_index(&self, id: Uuid, index: usize) -> bool {
        let Some(entry) = self.entry(id) else {
            warn!("No weather layer {} on the map", id);
            return false;
        };
        let Ok(mut layer) = entry.layer.write() else {
            return false;
        };
        if !layer.set_timestamp_index(index) {
            return false;
        }
        let _ = self.event_tx.send(LayerEvent::TemplateChanged {
            id,
            url_template: layer.url_template().to_string(),
        });
        true
    }

    /// Start playback of a layer, replacing any timer already running for it.
    ///
    /// A fresh start steps the layer once immediately. Replacing a running
    /// timer does not, so repeated starts never advance the layer twice.
    /// Must be called from within a tokio runtime.
    pub fn start_playback(&mut self, id: Uuid) -> bool {
        let play_interval = self.play_interval;
        let event_tx = self.event_tx.clone();
        let Some(entry) = self.entry_mut(id) else {
            return false;
        };
        let mut step_now = true;
        if let Some(previous) = entry.playback.take() {
            step_now = !previous.is_running();
            previous.stop();
        }
        entry.playback = Some(Playback::start(
            Arc::clone(&entry.layer),
            play_interval,
            event_tx,
            step_now,
        ));
        true
    }

    /// Pause playback of a layer. Returns whether a timer was running.
    pub fn stop_playback(&mut self, id: Uuid) -> bool {
        let Some(playback) = self.entry_mut(id).and_then(|entry| entry.playback.take()) else {
            return false;
        };
        let was_running = playback.is_running();
        playback.stop();
        was_running
    }

    /// Play/pause toggle. Returns whether the layer is now playing, or `None`
    /// if the layer is not on the map. Must be called from within a tokio
    /// runtime.
    pub fn toggle_playback(&mut self, id: Uuid) -> Option<bool> {
        self.entry(id)?;
        if self.is_playing(id) {
            self.stop_playback(id);
            Some(false)
        } else {
            self.start_playback(id);
            Some(true)
        }
    }

    #[must_use]
    pub fn is_playing(&self, id: Uuid) -> bool {
        self.entry(id)
            .and_then(|entry| entry.playback.as_ref())
            .is_some_and(Playback::is_running)
    }

    fn position(&self, id: Uuid) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == id)
    }

    fn entry(&self, id: Uuid) -> Option<&MapEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    fn entry_mut(&mut self, id: Uuid) -> Option<&mut MapEntry> {
        self.entries.iter_mut().find(|entry| entry.id == id)
    }
}
