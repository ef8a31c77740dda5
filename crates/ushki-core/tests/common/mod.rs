#![allow(dead_code)]

//! Shared doubles for exercising the core without mpv or the network.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use ushki_core::storage::{self, KeyValueStore, MemoryStore, StorageError};
use ushki_core::{AudioEngine, AudioHandle, EngineError, StreamEvent};
use ushki_directory::{DirectoryError, Station, StationDirectory};

// ── fake audio engine ─────────────────────────────────────────────────────────

/// One `open` call on the fake engine, with levers to drive the stream
/// from the test afterwards.
#[derive(Clone)]
pub struct OpenRecord {
    pub uri: String,
    pub volume: f32,
    /// Push stream events as if the backend emitted them.
    pub events: mpsc::Sender<StreamEvent>,
    pub handle: Arc<HandleState>,
}

#[derive(Default)]
pub struct HandleState {
    pub released: AtomicBool,
    pub paused_calls: Mutex<Vec<bool>>,
    pub volume_calls: Mutex<Vec<f32>>,
}

impl HandleState {
    pub fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct FakeEngine {
    opens: Mutex<Vec<OpenRecord>>,
    fail_next: AtomicBool,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `open` call returns `EngineError::Open`.
    pub fn fail_next_open(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub async fn open_count(&self) -> usize {
        self.opens.lock().await.len()
    }

    pub async fn open_record(&self, index: usize) -> OpenRecord {
        self.opens.lock().await[index].clone()
    }

    pub async fn last_open(&self) -> OpenRecord {
        let opens = self.opens.lock().await;
        opens.last().cloned().unwrap()
    }
}

#[async_trait]
impl AudioEngine for FakeEngine {
    async fn open(
        &self,
        uri: &str,
        initial_volume: f32,
    ) -> Result<(Box<dyn AudioHandle>, mpsc::Receiver<StreamEvent>), EngineError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(EngineError::Open("refused by test".to_string()));
        }
        let (events_tx, events_rx) = mpsc::channel(16);
        let state = Arc::new(HandleState::default());
        self.opens.lock().await.push(OpenRecord {
            uri: uri.to_string(),
            volume: initial_volume,
            events: events_tx,
            handle: state.clone(),
        });
        Ok((Box::new(FakeHandle { state }), events_rx))
    }
}

struct FakeHandle {
    state: Arc<HandleState>,
}

#[async_trait]
impl AudioHandle for FakeHandle {
    async fn set_paused(&mut self, paused: bool) -> Result<(), EngineError> {
        self.state.paused_calls.lock().await.push(paused);
        Ok(())
    }

    async fn set_volume(&mut self, volume: f32) -> Result<(), EngineError> {
        self.state.volume_calls.lock().await.push(volume);
        Ok(())
    }

    async fn release(&mut self) {
        self.state.released.store(true, Ordering::SeqCst);
    }
}

// ── fake directory ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum DirectoryCall {
    Top { limit: u32, offset: u32 },
    Search { query: String, limit: u32, offset: u32 },
}

/// Scripted directory: queued responses pop in order, empty pages after.
#[derive(Default)]
pub struct FakeDirectory {
    calls: Mutex<Vec<DirectoryCall>>,
    responses: Mutex<VecDeque<Result<Vec<Station>, DirectoryError>>>,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push_page(&self, page: Vec<Station>) {
        self.responses.lock().await.push_back(Ok(page));
    }

    pub async fn push_error(&self, msg: &str) {
        self.responses
            .lock()
            .await
            .push_back(Err(DirectoryError::other(msg)));
    }

    pub async fn calls(&self) -> Vec<DirectoryCall> {
        self.calls.lock().await.clone()
    }

    async fn next_response(&self) -> Result<Vec<Station>, DirectoryError> {
        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[async_trait]
impl StationDirectory for FakeDirectory {
    async fn top_stations(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Station>, DirectoryError> {
        self.calls
            .lock()
            .await
            .push(DirectoryCall::Top { limit, offset });
        self.next_response().await
    }

    async fn search_stations(
        &self,
        query: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Station>, DirectoryError> {
        self.calls.lock().await.push(DirectoryCall::Search {
            query: query.to_string(),
            limit,
            offset,
        });
        self.next_response().await
    }
}

// ── failing store ─────────────────────────────────────────────────────────────

/// In-memory store whose writes can be switched to fail, for exercising
/// storage-failure paths.
#[derive(Default)]
pub struct FailingStore {
    inner: MemoryStore,
    fail_writes: AtomicBool,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    fn broken() -> StorageError {
        StorageError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk unavailable",
        ))
    }
}

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, key: &str) -> storage::Result<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> storage::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::broken());
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> storage::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::broken());
        }
        self.inner.remove(key).await
    }
}

// ── station helpers ───────────────────────────────────────────────────────────

pub fn make_station(uuid: &str, name: &str) -> Station {
    Station {
        stationuuid: uuid.to_string(),
        name: name.to_string(),
        country: "Norway".to_string(),
        tags: "jazz,smooth".to_string(),
        url_resolved: format!("http://stream.example/{uuid}"),
        clickcount: 42,
    }
}

pub fn make_stations(prefix: &str, count: usize) -> Vec<Station> {
    (0..count)
        .map(|i| make_station(&format!("{prefix}-{i}"), &format!("{prefix} {i}")))
        .collect()
}
