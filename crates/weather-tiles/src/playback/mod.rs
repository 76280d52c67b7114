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

//! Timed playback through a layer's time series.
//!
//! A [`Playback`] owns one background timer task. Dropping or stopping the
//! handle cancels the task; a cancelled task never touches the layer again.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use log::{debug, info};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::layer::WeatherTileLayer;

/// Time between playback steps.
pub const DEFAULT_PLAY_INTERVAL: Duration = Duration::from_secs(2);

/// A layer shared between the map and its playback timer.
pub type SharedLayer = Arc<RwLock<WeatherTileLayer>>;

/// Changes to layers on a map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerEvent {
    /// A layer was added.
    Added(Uuid),
    /// A layer's tile URL template changed; its tiles need refreshing.
    TemplateChanged { id: Uuid, url_template: String },
    /// A layer was removed.
    Removed(Uuid),
}

/// Step a shared layer forward and report the new template.
///
/// Returns `false` when the layer could not be stepped.
pub fn step_layer(layer: &SharedLayer, event_tx: &broadcast::Sender<LayerEvent>) -> bool {
    let Ok(mut layer) = layer.write() else {
        return false;
    };
    if !layer.advance() {
        return false;
    }
    let _ = event_tx.send(LayerEvent::TemplateChanged {
        id: layer.id(),
        url_template: layer.url_template().to_string(),
    });
    true
}

/// Handle to a running playback timer.
pub struct Playback {
    layer_id: Uuid,
    cancel_token: CancellationToken,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for Playback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Playback")
            .field("layer_id", &self.layer_id)
            .field("cancel_token", &self.cancel_token)
            .finish_non_exhaustive()
    }
}

impl Playback {
    /// Start playing a layer.
    ///
    /// With `step_now` the layer steps forward once immediately; either way
    /// it then steps once per `period`, wrapping back to the first step after
    /// the last. Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(
        layer: SharedLayer,
        period: Duration,
        event_tx: broadcast::Sender<LayerEvent>,
        step_now: bool,
    ) -> Self {
        let layer_id = layer.read().map(|l| l.id()).unwrap_or_default();
        let cancel_token = CancellationToken::new();

        if step_now {
            step_layer(&layer, &event_tx);
        }
        info!("Playback started for layer {}", layer_id);

        let task_cancel = cancel_token.clone();
        let task = tokio::spawn(async move {
            playback_loop(layer, period, event_tx, task_cancel).await;
        });

        Self {
            layer_id,
            cancel_token,
            task,
        }
    }

    #[must_use]
    pub fn layer_id(&self) -> Uuid {
        self.layer_id
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.cancel_token.is_cancelled() && !self.task.is_finished()
    }

    /// Stop the timer.
    pub fn stop(&self) {
        if !self.cancel_token.is_cancelled() {
            info!("Playback stopped for layer {}", self.layer_id);
        }
        self.cancel_token.cancel();
    }
}

impl Drop for Playback {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

async fn playback_loop(
    layer: SharedLayer,
    period: Duration,
    event_tx: broadcast::Sender<LayerEvent>,
    cancel_token: CancellationToken,
) {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            () = cancel_token.cancelled() => {
                debug!("Playback task exiting");
                return;
            }
            _ = interval.tick() => {
                if cancel_token.is_cancelled() {
                    return;
                }
                step_layer(&layer, &event_tx);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{SeriesEntry, SeriesInfo};

    fn shared_layer(len: i64) -> SharedLayer {
        let series = (0..len).map(|i| SeriesEntry::observed(1000 - i)).collect();
        let info = SeriesInfo::new("radar", 10, series);
        Arc::new(RwLock::new(
            WeatherTileLayer::new(info, "KEY", "api.weather.com").unwrap(),
        ))
    }

    fn index(layer: &SharedLayer) -> usize {
        layer.read().unwrap().current_index()
    }

    #[tokio::test(start_paused = true)]
    async fn test_steps_immediately_then_each_period() {
        let layer = shared_layer(5);
        let (tx, _rx) = broadcast::channel(16);

        let playback = Playback::start(Arc::clone(&layer), DEFAULT_PLAY_INTERVAL, tx, true);
        assert_eq!(index(&layer), 1);

        tokio::time::sleep(Duration::from_millis(1900)).await;
        assert_eq!(index(&layer), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(index(&layer), 2);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(index(&layer), 3);
        assert!(playback.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_without_immediate_step() {
        let layer = shared_layer(5);
        let (tx, mut rx) = broadcast::channel(16);

        let _playback = Playback::start(Arc::clone(&layer), DEFAULT_PLAY_INTERVAL, tx, false);
        assert_eq!(index(&layer), 0);
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(index(&layer), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wraps_to_first_step() {
        let layer = shared_layer(3);
        let (tx, _rx) = broadcast::channel(16);

        let _playback = Playback::start(Arc::clone(&layer), DEFAULT_PLAY_INTERVAL, tx, true);
        assert_eq!(index(&layer), 1);

        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(index(&layer), 2);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(index(&layer), 0);
        assert_eq!(layer.read().unwrap().ts(), 1000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_timer() {
        let layer = shared_layer(5);
        let (tx, _rx) = broadcast::channel(16);

        let playback = Playback::start(Arc::clone(&layer), DEFAULT_PLAY_INTERVAL, tx, true);
        playback.stop();
        assert!(!playback.is_running());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(index(&layer), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_timer() {
        let layer = shared_layer(5);
        let (tx, _rx) = broadcast::channel(16);

        drop(Playback::start(Arc::clone(&layer), DEFAULT_PLAY_INTERVAL, tx, true));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(index(&layer), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_emits_template_changes() {
        let layer = shared_layer(3);
        let id = layer.read().unwrap().id();
        let (tx, mut rx) = broadcast::channel(16);

        let _playback = Playback::start(Arc::clone(&layer), DEFAULT_PLAY_INTERVAL, tx, true);

        match rx.recv().await.unwrap() {
            LayerEvent::TemplateChanged {
                id: event_id,
                url_template,
            } => {
                assert_eq!(event_id, id);
                assert!(url_template.contains("ts=999"));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
