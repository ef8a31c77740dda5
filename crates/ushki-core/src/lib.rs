//! Core engine for the ushki internet-radio player.
//!
//! The crate is headless: it owns playback, browsing, favorites and
//! persistence, and talks to the outside through three channels. Commands
//! and async completions go in through one mpsc sender, state snapshots
//! come out over a broadcast channel. A typical embedding:
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio::sync::{broadcast, mpsc};
//! use ushki_core::{Command, Config, JsonFileStore, MpvEngine, PlayerCore, PlayerEvent};
//! use ushki_core::RadioBrowserClient;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = Config::load()?;
//! let store = Arc::new(JsonFileStore::open(&config.storage.profile_path).await);
//! let directory = RadioBrowserClient::builder()
//!     .base_url(config.directory.base_url.as_str())
//!     .request_timeout(Duration::from_secs(config.directory.request_timeout_secs))
//!     .build()?;
//! let (event_tx, event_rx) = mpsc::channel(64);
//! let (update_tx, mut update_rx) = broadcast::channel(32);
//!
//! let core = PlayerCore::new(
//!     &config,
//!     Arc::new(MpvEngine::new()),
//!     Arc::new(directory),
//!     store,
//!     update_tx,
//!     event_tx.clone(),
//! )
//! .await;
//! tokio::spawn(core.run(event_rx));
//!
//! event_tx.send(PlayerEvent::Command(Command::SetQuery("jazz".into()))).await?;
//! let state = update_rx.recv().await?;
//! # Ok(())
//! # }
//! ```

pub mod browse;
pub mod config;
pub mod core;
pub mod engine;
pub mod favorites;
pub mod platform;
pub mod session;
pub mod settings;
pub mod storage;

pub use browse::{BrowseController, BrowseEvent, BrowseMode, FetchKind};
pub use config::Config;
pub use core::{Command, PlayerCore, PlayerEvent, PlayerState};
pub use engine::{AudioEngine, AudioHandle, EngineError, MpvEngine, StreamEvent};
pub use favorites::{Favorites, FavoritesStore};
pub use session::{PlaybackPhase, PlaybackSession};
pub use settings::SettingsStore;
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore, StorageError};

pub use ushki_directory::{RadioBrowserClient, Station, StationDirectory};
