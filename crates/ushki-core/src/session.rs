//! Playback session: the active station, its phase and the engine handle.
//!
//! The session owns at most one [`AudioHandle`] at a time. Every handle
//! release bumps a generation counter; stream events are tagged with the
//! generation they belong to, so events from a torn-down stream can never
//! touch the state of its successor.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use ushki_directory::Station;

use crate::engine::{AudioEngine, AudioHandle, StreamEvent};
use crate::settings::SettingsStore;

/// Where playback currently stands. `Idle` holds exactly when no station
/// is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PlaybackPhase {
    /// Nothing selected.
    #[default]
    Idle,
    /// Stream requested, no audio yet.
    Loading,
    Playing,
    Paused,
    /// The last open or stream attempt failed; the station stays selected.
    Errored,
}

pub struct PlaybackSession {
    engine: Arc<dyn AudioEngine>,
    settings: SettingsStore,
    events_tx: mpsc::Sender<(u64, StreamEvent)>,
    active: Option<Station>,
    phase: PlaybackPhase,
    volume: f32,
    handle: Option<Box<dyn AudioHandle>>,
    /// Bumped on every release. Events tagged with an older value belong
    /// to a stream that is already gone.
    generation: u64,
    forwarder: Option<AbortHandle>,
    last_error: Option<String>,
}

impl PlaybackSession {
    pub fn new(
        engine: Arc<dyn AudioEngine>,
        settings: SettingsStore,
        events_tx: mpsc::Sender<(u64, StreamEvent)>,
    ) -> Self {
        Self {
            engine,
            settings,
            events_tx,
            active: None,
            phase: PlaybackPhase::Idle,
            volume: crate::settings::DEFAULT_VOLUME,
            handle: None,
            generation: 0,
            forwarder: None,
            last_error: None,
        }
    }

    /// Rehydrates volume and the last station from storage. The restored
    /// station comes back paused; no stream is opened until the user asks.
    pub async fn restore(&mut self, fallback_volume: f32) {
        self.volume = self.settings.load_volume(fallback_volume).await;
        if let Some(station) = self.settings.load_last_station().await {
            info!("session: restored '{}' (paused)", station.name);
            self.active = Some(station);
            self.phase = PlaybackPhase::Paused;
        }
    }

    /// Selects a station and starts streaming it. Re-playing the station
    /// that already owns the live stream toggles pause instead.
    pub async fn play(&mut self, station: Station) {
        if let Some(active) = &self.active {
            if active.stationuuid == station.stationuuid && self.handle.is_some() {
                self.toggle_play_pause().await;
                return;
            }
        }
        self.start_stream(station).await;
    }

    pub async fn toggle_play_pause(&mut self) {
        let Some(active) = self.active.clone() else {
            debug!("session: toggle with no active station");
            return;
        };
        if self.handle.is_none() {
            // Paused after a finished stream, or errored: start over.
            self.start_stream(active).await;
            return;
        }
        match self.phase {
            PlaybackPhase::Playing => self.set_paused(true).await,
            PlaybackPhase::Paused => self.set_paused(false).await,
            PlaybackPhase::Loading => {
                debug!("session: toggle ignored while loading");
            }
            PlaybackPhase::Errored | PlaybackPhase::Idle => {
                self.start_stream(active).await;
            }
        }
    }

    /// Clears the active station entirely, including the persisted one.
    pub async fn stop(&mut self) {
        if self.active.is_none() && self.handle.is_none() {
            debug!("session: stop with nothing active");
            return;
        }
        info!("session: stop");
        self.release_handle().await;
        self.active = None;
        self.phase = PlaybackPhase::Idle;
        self.last_error = None;
        self.settings.clear_last_station().await;
    }

    /// Clamps into [0.0, 1.0], applies to the live stream if any, and
    /// persists. Persisting does not depend on a stream being open.
    pub async fn set_volume(&mut self, volume: f32) {
        if !volume.is_finite() {
            warn!("session: ignoring non-finite volume {}", volume);
            return;
        }
        let clamped = volume.clamp(0.0, 1.0);
        self.volume = clamped;
        if let Some(handle) = self.handle.as_mut() {
            if let Err(e) = handle.set_volume(clamped).await {
                warn!("session: volume change not applied: {}", e);
            }
        }
        self.settings.save_volume(clamped).await;
    }

    /// Feeds one engine event back into the session. Events from an older
    /// generation are discarded without touching any state.
    pub async fn apply_stream_event(&mut self, generation: u64, event: StreamEvent) {
        if generation != self.generation {
            debug!("session: discarding stale stream event {:?}", event);
            return;
        }
        match event {
            StreamEvent::Loaded => {
                if self.phase == PlaybackPhase::Loading {
                    self.phase = PlaybackPhase::Playing;
                }
            }
            StreamEvent::Playing(playing) => {
                if self.handle.is_some() {
                    self.phase = if playing {
                        PlaybackPhase::Playing
                    } else {
                        PlaybackPhase::Paused
                    };
                }
            }
            StreamEvent::Finished => {
                info!("session: stream finished");
                self.release_handle().await;
                if self.active.is_some() {
                    self.phase = PlaybackPhase::Paused;
                }
            }
            StreamEvent::Errored(msg) => {
                warn!("session: stream error: {}", msg);
                self.release_handle().await;
                self.last_error = Some(msg);
                if self.active.is_some() {
                    self.phase = PlaybackPhase::Errored;
                }
            }
        }
    }

    /// Releases the live stream without clearing the selection.
    pub async fn shutdown(&mut self) {
        self.release_handle().await;
    }

    pub fn active_station(&self) -> Option<&Station> {
        self.active.as_ref()
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    async fn start_stream(&mut self, station: Station) {
        self.release_handle().await;

        self.settings.save_last_station(&station).await;
        info!("session: loading '{}'", station.name);
        self.active = Some(station.clone());
        self.phase = PlaybackPhase::Loading;
        self.last_error = None;

        match self.engine.open(&station.url_resolved, self.volume).await {
            Ok((handle, events)) => {
                self.handle = Some(handle);
                self.spawn_forwarder(events);
            }
            Err(e) => {
                warn!("session: failed to open '{}': {}", station.url_resolved, e);
                self.phase = PlaybackPhase::Errored;
                self.last_error = Some(e.to_string());
            }
        }
    }

    /// Forwards engine events into the shared loop, tagged with the
    /// generation current at spawn time.
    fn spawn_forwarder(&mut self, mut events: mpsc::Receiver<StreamEvent>) {
        let generation = self.generation;
        let tx = self.events_tx.clone();
        let task = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if tx.send((generation, event)).await.is_err() {
                    break;
                }
            }
        });
        self.forwarder = Some(task.abort_handle());
    }

    async fn release_handle(&mut self) {
        self.generation += 1;
        if let Some(task) = self.forwarder.take() {
            task.abort();
        }
        if let Some(mut handle) = self.handle.take() {
            handle.release().await;
        }
    }

    async fn set_paused(&mut self, paused: bool) {
        let Some(handle) = self.handle.as_mut() else {
            return;
        };
        match handle.set_paused(paused).await {
            Ok(()) => {
                self.phase = if paused {
                    PlaybackPhase::Paused
                } else {
                    PlaybackPhase::Playing
                };
            }
            Err(e) => {
                // A dying stream reports through its event channel; the
                // Errored event drives the transition.
                warn!("session: pause toggle failed: {}", e);
            }
        }
    }
}
