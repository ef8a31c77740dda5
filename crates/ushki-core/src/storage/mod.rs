//! Key-value persistence behind the settings and favorites stores.

mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;

/// Keys the player persists under. One flat namespace, stable across
/// releases.
pub mod keys {
    pub const LAST_STATION: &str = "last_station";
    pub const VOLUME: &str = "volume";
    pub const FAVORITES: &str = "favorites";
}

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored value could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Minimal async key-value contract the player persists through.
///
/// Implementations serialize their own mutations; the read-modify-write
/// sequences layered on top are serialized by their single owner.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}
