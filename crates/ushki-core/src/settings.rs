//! Last-played station and volume persistence.

use std::sync::Arc;

use tracing::warn;
use ushki_directory::Station;

use crate::storage::{keys, KeyValueStore};

/// Volume used when nothing usable was ever persisted.
pub const DEFAULT_VOLUME: f32 = 1.0;

/// Typed accessors over the key-value store. Read failures degrade to
/// defaults; write failures are logged and swallowed. Nothing here is
/// allowed to take the player down.
#[derive(Clone)]
pub struct SettingsStore {
    kv: Arc<dyn KeyValueStore>,
}

impl SettingsStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub async fn load_last_station(&self) -> Option<Station> {
        let raw = match self.kv.get(keys::LAST_STATION).await {
            Ok(value) => value?,
            Err(e) => {
                warn!("settings: failed to read last station: {}", e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(station) => Some(station),
            Err(e) => {
                warn!("settings: stored last station unreadable: {}", e);
                None
            }
        }
    }

    pub async fn save_last_station(&self, station: &Station) {
        match serde_json::to_string(station) {
            Ok(json) => {
                if let Err(e) = self.kv.set(keys::LAST_STATION, &json).await {
                    warn!("settings: failed to persist last station: {}", e);
                }
            }
            Err(e) => warn!("settings: failed to encode last station: {}", e),
        }
    }

    pub async fn clear_last_station(&self) {
        if let Err(e) = self.kv.remove(keys::LAST_STATION).await {
            warn!("settings: failed to clear last station: {}", e);
        }
    }

    /// Persisted volume clamped to [0, 1], or `default` when unset or
    /// unreadable. An out-of-range `default` is clamped the same way.
    pub async fn load_volume(&self, default: f32) -> f32 {
        let default = if default.is_finite() && (0.0..=1.0).contains(&default) {
            default
        } else {
            let usable = if default.is_finite() {
                default.clamp(0.0, 1.0)
            } else {
                DEFAULT_VOLUME
            };
            warn!(
                "settings: configured volume {} out of range, using {}",
                default, usable
            );
            usable
        };
        let raw = match self.kv.get(keys::VOLUME).await {
            Ok(Some(value)) => value,
            Ok(None) => return default,
            Err(e) => {
                warn!("settings: failed to read volume: {}", e);
                return default;
            }
        };
        match raw.parse::<f32>() {
            Ok(volume) if volume.is_finite() => volume.clamp(0.0, 1.0),
            _ => {
                warn!("settings: stored volume {:?} unreadable, using default", raw);
                default
            }
        }
    }

    pub async fn save_volume(&self, volume: f32) {
        if let Err(e) = self.kv.set(keys::VOLUME, &volume.to_string()).await {
            warn!("settings: failed to persist volume: {}", e);
        }
    }
}
