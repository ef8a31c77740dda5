//! The player core: single owner of all mutable state.
//!
//! Everything funnels through one mpsc channel into the loop; stream events
//! and fetch completions re-enter through the same sender the embedder uses
//! for commands. After every handled event the core publishes a full
//! [`PlayerState`] snapshot on a broadcast channel.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use ushki_directory::{Station, StationDirectory};

use crate::browse::{BrowseController, BrowseEvent};
use crate::config::Config;
use crate::engine::{AudioEngine, StreamEvent};
use crate::favorites::{Favorites, FavoritesStore};
use crate::session::{PlaybackPhase, PlaybackSession};
use crate::settings::SettingsStore;
use crate::storage::KeyValueStore;

/// Requests from the embedding surface.
#[derive(Debug, Clone)]
pub enum Command {
    Play(Station),
    TogglePlayPause,
    Stop,
    SetVolume(f32),
    ToggleFavorite(Station),
    SetQuery(String),
    LoadMore,
    Refresh,
    Shutdown,
}

/// Everything the loop reacts to.
#[derive(Debug)]
pub enum PlayerEvent {
    Command(Command),
    Stream { generation: u64, event: StreamEvent },
    Browse(BrowseEvent),
}

/// Immutable snapshot published after every handled event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerState {
    pub active_station: Option<Station>,
    pub phase: PlaybackPhase,
    pub volume: f32,
    pub last_error: Option<String>,

    pub query: String,
    pub results: Vec<Station>,
    pub loading: bool,
    pub loading_more: bool,
    pub refreshing: bool,
    pub exhausted: bool,

    pub favorites: Vec<Station>,
}

pub struct PlayerCore {
    session: PlaybackSession,
    browse: BrowseController,
    favorites: Favorites,
    update_tx: broadcast::Sender<PlayerState>,
}

impl PlayerCore {
    /// Wires the core together. `event_tx` is the same sender the caller
    /// keeps for commands; stream and browse completions re-enter the loop
    /// through clones of it.
    pub async fn new(
        config: &Config,
        engine: Arc<dyn AudioEngine>,
        directory: Arc<dyn StationDirectory>,
        store: Arc<dyn KeyValueStore>,
        update_tx: broadcast::Sender<PlayerState>,
        event_tx: mpsc::Sender<PlayerEvent>,
    ) -> Self {
        let (stream_tx, mut stream_rx) = mpsc::channel::<(u64, StreamEvent)>(64);
        {
            let event_tx = event_tx.clone();
            tokio::spawn(async move {
                while let Some((generation, event)) = stream_rx.recv().await {
                    if event_tx
                        .send(PlayerEvent::Stream { generation, event })
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
            });
        }

        let (browse_tx, mut browse_rx) = mpsc::channel::<BrowseEvent>(16);
        tokio::spawn(async move {
            while let Some(event) = browse_rx.recv().await {
                if event_tx.send(PlayerEvent::Browse(event)).await.is_err() {
                    break;
                }
            }
        });

        let settings = SettingsStore::new(store.clone());
        let mut session = PlaybackSession::new(engine, settings, stream_tx);
        session.restore(config.player.default_volume).await;

        let browse = BrowseController::new(
            directory,
            config.directory.page_size,
            Duration::from_millis(config.directory.search_debounce_ms),
            browse_tx,
        );

        let favorites = Favorites::load(FavoritesStore::new(store)).await;

        Self {
            session,
            browse,
            favorites,
            update_tx,
        }
    }

    /// Runs until `Shutdown` or until every event sender is gone.
    pub async fn run(mut self, mut event_rx: mpsc::Receiver<PlayerEvent>) -> anyhow::Result<()> {
        info!("player core starting");

        // Mount: the empty query kicks off the first top-stations fetch
        // immediately, before any debounce applies.
        self.browse.set_query(String::new());
        self.publish();

        while let Some(event) = event_rx.recv().await {
            match event {
                PlayerEvent::Command(cmd) => {
                    if !self.handle_command(cmd).await {
                        break;
                    }
                }
                PlayerEvent::Stream { generation, event } => {
                    self.session.apply_stream_event(generation, event).await;
                }
                PlayerEvent::Browse(event) => match event {
                    BrowseEvent::Debounced { seq } => self.browse.on_debounce_elapsed(seq),
                    BrowseEvent::PageFetched {
                        kind,
                        epoch,
                        result,
                    } => self.browse.on_page_fetched(kind, epoch, result),
                },
            }
            self.publish();
        }

        info!("player core stopped");
        Ok(())
    }

    /// Returns false when the loop should exit.
    async fn handle_command(&mut self, cmd: Command) -> bool {
        debug!("command: {:?}", cmd);
        match cmd {
            Command::Play(station) => self.session.play(station).await,
            Command::TogglePlayPause => self.session.toggle_play_pause().await,
            Command::Stop => self.session.stop().await,
            Command::SetVolume(volume) => self.session.set_volume(volume).await,
            Command::ToggleFavorite(station) => {
                if let Err(e) = self.favorites.toggle(&station).await {
                    warn!("favorite toggle for '{}' not persisted: {}", station.name, e);
                }
            }
            Command::SetQuery(query) => self.browse.set_query(query),
            Command::LoadMore => self.browse.load_more(),
            Command::Refresh => self.browse.refresh(),
            Command::Shutdown => {
                self.session.shutdown().await;
                return false;
            }
        }
        true
    }

    fn publish(&self) {
        let state = PlayerState {
            active_station: self.session.active_station().cloned(),
            phase: self.session.phase(),
            volume: self.session.volume(),
            last_error: self.session.last_error().map(str::to_string),
            query: self.browse.query().to_string(),
            results: self.browse.stations().to_vec(),
            loading: self.browse.loading(),
            loading_more: self.browse.loading_more(),
            refreshing: self.browse.refreshing(),
            exhausted: self.browse.exhausted(),
            favorites: self.favorites.all().to_vec(),
        };
        // Nobody listening is fine.
        let _ = self.update_tx.send(state);
    }
}
