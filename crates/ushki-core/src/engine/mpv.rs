//! mpv-backed audio engine: one subprocess per handle over JSON IPC.
//!
//! Architecture (per handle):
//!
//! ```text
//!   MpvEngine::open(uri)
//!         │  spawns `mpv --no-video <uri>`, connects to its IPC socket
//!         ├── writer_task  ← receives IpcRequest via mpsc, serialises → socket
//!         ├── reader_task  ← reads JSON lines from socket
//!         │                    ├── response (request_id) → matched oneshot
//!         │                    └── event / property-change → raw event channel
//!         └── event_mapper ← folds raw mpv events into StreamEvents
//! ```
//!
//! Platform notes:
//! - Unix:    Unix domain sockets
//! - Windows: named pipes  \\.\pipe\<name>

use std::collections::HashMap;
#[cfg(unix)]
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Child;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

#[cfg(unix)]
use tokio::net::UnixStream;

#[cfg(windows)]
use tokio::net::windows::named_pipe::ClientOptions;

use super::{AudioEngine, AudioHandle, EngineError, StreamEvent};
use crate::platform;

// ── request-id / handle-tag counters ──────────────────────────────────────────

static NEXT_REQ_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_HANDLE_TAG: AtomicU64 = AtomicU64::new(1);

// ── observation property IDs ──────────────────────────────────────────────────

/// Fixed observe_property IDs. We match on these in property-change events.
const OBS_CORE_IDLE: u64 = 1;
const OBS_PAUSE: u64 = 2;

// ── internal channel types ────────────────────────────────────────────────────

struct IpcRequest {
    req_id: u64,
    payload: String, // serialised JSON line (already has '\n')
    reply: oneshot::Sender<Result<Value, EngineError>>,
}

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, EngineError>>>>>;

// ── engine ────────────────────────────────────────────────────────────────────

/// Spawns one mpv process per opened stream. Stateless apart from the
/// binary it launches.
pub struct MpvEngine {
    binary: String,
}

impl MpvEngine {
    pub fn new() -> Self {
        Self {
            binary: platform::mpv_binary_name().to_string(),
        }
    }

    /// Use a specific mpv binary instead of resolving from PATH.
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for MpvEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioEngine for MpvEngine {
    async fn open(
        &self,
        uri: &str,
        initial_volume: f32,
    ) -> Result<(Box<dyn AudioHandle>, mpsc::Receiver<StreamEvent>), EngineError> {
        let tag = NEXT_HANDLE_TAG.fetch_add(1, Ordering::Relaxed);
        let socket_name = platform::mpv_socket_name(tag);

        let vol_arg = format!(
            "--volume={}",
            (initial_volume * 100.0).clamp(0.0, 100.0).round() as i64
        );
        let ipc_arg = platform::mpv_socket_arg(&socket_name);

        info!("mpv: spawning for {}", uri);
        // kill_on_drop covers every early-return below; release() does the
        // graceful teardown.
        let mut child = tokio::process::Command::new(&self.binary)
            .arg("--no-video")
            .arg("--quiet")
            .arg(&ipc_arg)
            .arg(vol_arg)
            .arg("--")
            .arg(uri)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::Open(format!("failed to spawn mpv: {e}")))?;

        let (raw_tx, raw_rx) = mpsc::channel::<Value>(64);
        let ipc = connect_ipc(&socket_name, &mut child, raw_tx).await?;

        let (events_tx, events_rx) = mpsc::channel::<StreamEvent>(32);
        let mapper = tokio::spawn(event_mapper(raw_rx, events_tx));

        let handle = MpvHandle {
            ipc,
            child: Some(child),
            #[cfg(unix)]
            socket_path: Some(PathBuf::from(&socket_name)),
            mapper: mapper.abort_handle(),
        };

        // Register interest in the two properties the event stream derives
        // from. mpv pushes the current value right away and on every change.
        for (id, name) in [(OBS_CORE_IDLE, "core-idle"), (OBS_PAUSE, "pause")] {
            if let Err(e) = handle.send(json!(["observe_property", id, name])).await {
                warn!("mpv: observe_property {} failed: {}", name, e);
            }
        }

        Ok((Box::new(handle), events_rx))
    }
}

// ── connection ────────────────────────────────────────────────────────────────

#[cfg(unix)]
async fn connect_ipc(
    socket_name: &str,
    child: &mut Child,
    raw_tx: mpsc::Sender<Value>,
) -> Result<mpsc::Sender<IpcRequest>, EngineError> {
    let socket_path = std::path::Path::new(socket_name);

    // Wait for the socket to appear, bailing early if mpv already died
    // (bad binary, unsupported flag).
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if socket_path.exists() {
            break;
        }
        if let Ok(Some(status)) = child.try_wait() {
            return Err(EngineError::Open(format!(
                "mpv exited during startup ({status})"
            )));
        }
    }
    if !socket_path.exists() {
        return Err(EngineError::Open("mpv IPC socket did not appear".to_string()));
    }
    // mpv needs a beat between creating the socket and accepting on it.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let stream = UnixStream::connect(socket_path)
        .await
        .map_err(|e| EngineError::Open(format!("mpv IPC connect failed: {e}")))?;
    debug!("mpv: connected to IPC socket {}", socket_name);

    let (read_half, write_half) = stream.into_split();
    Ok(start_io_tasks(BufReader::new(read_half), write_half, raw_tx))
}

#[cfg(windows)]
async fn connect_ipc(
    socket_name: &str,
    child: &mut Child,
    raw_tx: mpsc::Sender<Value>,
) -> Result<mpsc::Sender<IpcRequest>, EngineError> {
    let pipe_path = format!(r"\\.\pipe\{}", socket_name);

    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        match ClientOptions::new().open(&pipe_path) {
            Ok(pipe) => {
                debug!("mpv: connected to named pipe {}", pipe_path);
                let (read_half, write_half) = tokio::io::split(pipe);
                return Ok(start_io_tasks(
                    BufReader::new(read_half),
                    write_half,
                    raw_tx,
                ));
            }
            Err(_) => {
                if let Ok(Some(status)) = child.try_wait() {
                    return Err(EngineError::Open(format!(
                        "mpv exited during startup ({status})"
                    )));
                }
            }
        }
    }
    Err(EngineError::Open("mpv named pipe did not appear".to_string()))
}

fn start_io_tasks<R, W>(
    reader: BufReader<R>,
    writer: W,
    raw_tx: mpsc::Sender<Value>,
) -> mpsc::Sender<IpcRequest>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
    W: tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    // pending map: req_id → reply channel. Writer inserts, reader resolves.
    let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
    let (cmd_tx, cmd_rx) = mpsc::channel::<IpcRequest>(64);

    tokio::spawn(writer_task(writer, cmd_rx, pending.clone()));
    tokio::spawn(reader_task(reader, pending, raw_tx));

    cmd_tx
}

// ── handle ────────────────────────────────────────────────────────────────────

/// One live mpv process plus its IPC plumbing.
pub struct MpvHandle {
    ipc: mpsc::Sender<IpcRequest>,
    child: Option<Child>,
    #[cfg(unix)]
    socket_path: Option<PathBuf>,
    mapper: AbortHandle,
}

impl MpvHandle {
    async fn send(&self, command: Value) -> Result<Value, EngineError> {
        let req_id = NEXT_REQ_ID.fetch_add(1, Ordering::Relaxed);
        let msg = json!({ "command": command, "request_id": req_id });
        let mut raw = serde_json::to_string(&msg)
            .map_err(|e| EngineError::Unavailable(format!("encode failed: {e}")))?;
        raw.push('\n');

        let (reply_tx, reply_rx) = oneshot::channel();
        self.ipc
            .send(IpcRequest {
                req_id,
                payload: raw,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::Unavailable("mpv writer task gone".to_string()))?;

        tokio::time::timeout(Duration::from_secs(5), reply_rx)
            .await
            .map_err(|_| EngineError::Unavailable(format!("mpv IPC timeout for req={req_id}")))?
            .map_err(|_| {
                EngineError::Unavailable(format!("mpv reply channel dropped req={req_id}"))
            })?
    }
}

#[async_trait]
impl AudioHandle for MpvHandle {
    async fn set_paused(&mut self, paused: bool) -> Result<(), EngineError> {
        self.send(json!(["set_property", "pause", paused])).await?;
        Ok(())
    }

    async fn set_volume(&mut self, volume: f32) -> Result<(), EngineError> {
        let vol_pct = (volume * 100.0).clamp(0.0, 100.0);
        self.send(json!(["set_property", "volume", vol_pct])).await?;
        Ok(())
    }

    async fn release(&mut self) {
        // Stop mapping events first so our own kill never surfaces as a
        // stream error.
        self.mapper.abort();
        if let Some(mut child) = self.child.take() {
            let _ = child.kill().await;
        }
        #[cfg(unix)]
        if let Some(path) = self.socket_path.take() {
            let _ = tokio::fs::remove_file(&path).await;
        }
        debug!("mpv: handle released");
    }
}

// ── reader task ───────────────────────────────────────────────────────────────

async fn reader_task<R>(mut reader: BufReader<R>, pending: Pending, raw_tx: mpsc::Sender<Value>)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("mpv reader: connection closed");
                fail_pending(&pending, "mpv IPC connection closed").await;
                break;
            }
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let val: Value = match serde_json::from_str(trimmed) {
                    Ok(v) => v,
                    Err(e) => {
                        debug!("mpv reader: invalid json '{}': {}", trimmed, e);
                        continue;
                    }
                };

                if let Some(req_id) = val.get("request_id").and_then(|v| v.as_u64()) {
                    // Command response: route to the matching request.
                    let mut map = pending.lock().await;
                    if let Some(tx) = map.remove(&req_id) {
                        let result = if val["error"].as_str() == Some("success") {
                            Ok(val)
                        } else {
                            let err = val["error"]
                                .as_str()
                                .unwrap_or("unknown error")
                                .to_string();
                            debug!("mpv reader: response req={} err={}", req_id, err);
                            Err(EngineError::Command(err))
                        };
                        let _ = tx.send(result);
                    } else {
                        debug!("mpv reader: response for unknown req={}", req_id);
                    }
                } else {
                    // Unsolicited event / property-change.
                    let _ = raw_tx.send(val).await;
                }
            }
            Err(e) => {
                warn!("mpv reader: read error: {}", e);
                fail_pending(&pending, &format!("mpv IPC read error: {e}")).await;
                break;
            }
        }
    }
}

async fn fail_pending(pending: &Pending, reason: &str) {
    let mut map = pending.lock().await;
    for (_, tx) in map.drain() {
        let _ = tx.send(Err(EngineError::Unavailable(reason.to_string())));
    }
}

// ── writer task ───────────────────────────────────────────────────────────────

async fn writer_task<W>(mut writer: W, mut rx: mpsc::Receiver<IpcRequest>, pending: Pending)
where
    W: tokio::io::AsyncWrite + Unpin,
{
    while let Some(req) = rx.recv().await {
        // Register the reply channel before writing so the reader can match it.
        {
            let mut map = pending.lock().await;
            map.insert(req.req_id, req.reply);
        }
        if let Err(e) = writer.write_all(req.payload.as_bytes()).await {
            warn!("mpv writer: write error: {}", e);
            let mut map = pending.lock().await;
            if let Some(tx) = map.remove(&req.req_id) {
                let _ = tx.send(Err(EngineError::Unavailable(format!(
                    "mpv write error: {e}"
                ))));
            }
            break;
        }
    }
    debug!("mpv writer: task exiting");
}

// ── event mapping ─────────────────────────────────────────────────────────────

/// Folds raw mpv events into the engine's stream events. `Loaded` fires on
/// the first sign of audio (core-idle dropping or file-loaded); pause flips
/// only count once loaded, so the initial property report stays silent.
struct EventFold {
    loaded: bool,
}

impl EventFold {
    fn new() -> Self {
        Self { loaded: false }
    }

    fn fold(&mut self, raw: &Value) -> Option<StreamEvent> {
        if let Some((id, data)) = as_property_change(raw) {
            return match id {
                OBS_CORE_IDLE => {
                    if data.as_bool() == Some(false) && !self.loaded {
                        self.loaded = true;
                        Some(StreamEvent::Loaded)
                    } else {
                        None
                    }
                }
                OBS_PAUSE => {
                    let paused = data.as_bool()?;
                    if self.loaded {
                        Some(StreamEvent::Playing(!paused))
                    } else {
                        None
                    }
                }
                _ => None,
            };
        }

        match event_name(raw) {
            Some("file-loaded") if !self.loaded => {
                self.loaded = true;
                Some(StreamEvent::Loaded)
            }
            Some("end-file") => match raw.get("reason").and_then(|r| r.as_str()) {
                Some("eof") => Some(StreamEvent::Finished),
                Some("error") => {
                    let detail = raw
                        .get("file_error")
                        .and_then(|e| e.as_str())
                        .unwrap_or("stream failed");
                    Some(StreamEvent::Errored(detail.to_string()))
                }
                // stop/quit arrive when we kill the process ourselves.
                _ => None,
            },
            _ => None,
        }
    }
}

async fn event_mapper(mut raw_rx: mpsc::Receiver<Value>, events_tx: mpsc::Sender<StreamEvent>) {
    let mut fold = EventFold::new();
    while let Some(raw) = raw_rx.recv().await {
        if let Some(event) = fold.fold(&raw) {
            debug!("mpv: stream event {:?}", event);
            let terminal = matches!(event, StreamEvent::Finished | StreamEvent::Errored(_));
            if events_tx.send(event).await.is_err() || terminal {
                return;
            }
        }
    }
    // Raw channel closed without a terminal event: the process died on us.
    let _ = events_tx
        .send(StreamEvent::Errored("mpv exited unexpectedly".to_string()))
        .await;
}

/// Returns `Some((obs_id, data))` if this is a property-change event.
fn as_property_change(raw: &Value) -> Option<(u64, &Value)> {
    if raw.get("event")?.as_str()? == "property-change" {
        let id = raw.get("id")?.as_u64()?;
        let data = raw.get("data").unwrap_or(&Value::Null);
        Some((id, data))
    } else {
        None
    }
}

/// Returns the event name, e.g. "end-file", "start-file", "file-loaded".
fn event_name(raw: &Value) -> Option<&str> {
    raw.get("event")?.as_str()
}
