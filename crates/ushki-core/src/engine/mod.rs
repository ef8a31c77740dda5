//! Audio engine seam: one handle per open stream, events until release.

pub mod mpv;

pub use mpv::MpvEngine;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Events a live handle emits, in arrival order.
///
/// `Loaded` fires once when audio is actually flowing. `Playing` reports
/// pause-state flips after that. `Finished` and `Errored` are terminal; the
/// receiver closing without a terminal event means the handle went away.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Loaded,
    Playing(bool),
    Finished,
    Errored(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// The stream could not be opened (spawn, connect or load stage).
    #[error("failed to open stream: {0}")]
    Open(String),

    /// The handle stopped accepting commands (backing process gone).
    #[error("audio handle unavailable: {0}")]
    Unavailable(String),

    /// The backend rejected a command.
    #[error("engine command failed: {0}")]
    Command(String),
}

/// Factory for audio handles. The engine does not limit how many handles
/// exist; the playback session is the component that holds at most one.
#[async_trait]
pub trait AudioEngine: Send + Sync {
    /// Opens `uri` ready to play at `initial_volume` (0.0 to 1.0). Events
    /// for the handle arrive on the returned receiver until the handle is
    /// released or a terminal event fires.
    async fn open(
        &self,
        uri: &str,
        initial_volume: f32,
    ) -> Result<(Box<dyn AudioHandle>, mpsc::Receiver<StreamEvent>), EngineError>;
}

/// One open stream. `release` tears the backing resources down; dropping a
/// handle without releasing falls back to best-effort cleanup.
#[async_trait]
pub trait AudioHandle: Send {
    async fn set_paused(&mut self, paused: bool) -> Result<(), EngineError>;
    async fn set_volume(&mut self, volume: f32) -> Result<(), EngineError>;
    async fn release(&mut self);
}
