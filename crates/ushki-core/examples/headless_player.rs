//! Minimal headless player: fetches the top stations, plays the first one
//! for ten seconds, then shuts down.
//!
//!   cargo run -p ushki-core --example headless_player

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};

use ushki_core::{
    Command, Config, JsonFileStore, MpvEngine, PlayerCore, PlayerEvent, RadioBrowserClient,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::load()?;
    let store = Arc::new(JsonFileStore::open(&config.storage.profile_path).await);
    let directory = RadioBrowserClient::builder()
        .base_url(config.directory.base_url.as_str())
        .request_timeout(Duration::from_secs(config.directory.request_timeout_secs))
        .build()?;

    let (event_tx, event_rx) = mpsc::channel(64);
    let (update_tx, mut update_rx) = broadcast::channel(32);

    let core = PlayerCore::new(
        &config,
        Arc::new(MpvEngine::new()),
        Arc::new(directory),
        store,
        update_tx,
        event_tx.clone(),
    )
    .await;
    let core_task = tokio::spawn(core.run(event_rx));

    let station = loop {
        let state = update_rx.recv().await?;
        if let Some(station) = state.results.first() {
            break station.clone();
        }
    };
    println!("playing {} ({})", station.name, station.country_label());
    event_tx
        .send(PlayerEvent::Command(Command::Play(station)))
        .await?;

    let listen = async {
        let mut last_phase = None;
        while let Ok(state) = update_rx.recv().await {
            if Some(state.phase) != last_phase {
                println!("phase: {:?}", state.phase);
                last_phase = Some(state.phase);
            }
        }
    };
    let _ = tokio::time::timeout(Duration::from_secs(10), listen).await;

    event_tx
        .send(PlayerEvent::Command(Command::Shutdown))
        .await?;
    core_task.await??;
    Ok(())
}
