//! Favorites persistence and in-memory membership.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};
use ushki_directory::Station;

use crate::storage::{keys, KeyValueStore, Result};

/// Read-modify-write access to the persisted favorites list.
///
/// The persisted list is the source of truth: every mutation re-reads it
/// before writing, so a stale in-memory copy can never be written back over
/// newer data.
#[derive(Clone)]
pub struct FavoritesStore {
    kv: Arc<dyn KeyValueStore>,
}

impl FavoritesStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Full favorites list in insertion order. Missing or unreadable data
    /// yields an empty list; this path never fails.
    pub async fn load_all(&self) -> Vec<Station> {
        match self.read_list().await {
            Ok(list) => list,
            Err(e) => {
                warn!("favorites: failed to read list: {e}");
                Vec::new()
            }
        }
    }

    /// Appends `station` unless its id is already present.
    pub async fn add(&self, station: &Station) -> Result<()> {
        let mut list = self.read_list().await?;
        if list.iter().any(|s| s.stationuuid == station.stationuuid) {
            return Ok(());
        }
        list.push(station.clone());
        self.write_list(&list).await
    }

    /// Removes the station with `station_id`, if present.
    pub async fn remove(&self, station_id: &str) -> Result<()> {
        let mut list = self.read_list().await?;
        let before = list.len();
        list.retain(|s| s.stationuuid != station_id);
        if list.len() != before {
            self.write_list(&list).await?;
        }
        Ok(())
    }

    async fn read_list(&self) -> Result<Vec<Station>> {
        let raw = self.kv.get(keys::FAVORITES).await?;
        Ok(match raw {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("favorites: stored list unreadable, treating as empty: {e}");
                Vec::new()
            }),
            None => Vec::new(),
        })
    }

    async fn write_list(&self, list: &[Station]) -> Result<()> {
        let json = serde_json::to_string(list)?;
        self.kv.set(keys::FAVORITES, &json).await
    }
}

/// In-memory membership mirroring the persisted list, for O(1) lookups and
/// display ordering. Mutations go through the store first; memory is only
/// updated once the write succeeded, so a failed toggle leaves membership
/// unchanged.
pub struct Favorites {
    store: FavoritesStore,
    ids: HashSet<String>,
    list: Vec<Station>,
}

impl Favorites {
    /// Loads the persisted list; unreadable storage starts empty.
    pub async fn load(store: FavoritesStore) -> Self {
        let list = store.load_all().await;
        let ids = list.iter().map(|s| s.stationuuid.clone()).collect();
        debug!("favorites: {} station(s) loaded", list.len());
        Self { store, ids, list }
    }

    pub fn is_favorite(&self, station_id: &str) -> bool {
        self.ids.contains(station_id)
    }

    /// Favorites in insertion order, snapshots taken at favoriting time.
    pub fn all(&self) -> &[Station] {
        &self.list
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Adds or removes `station`; returns whether it is a favorite now.
    pub async fn toggle(&mut self, station: &Station) -> Result<bool> {
        if self.ids.contains(&station.stationuuid) {
            self.store.remove(&station.stationuuid).await?;
            self.ids.remove(&station.stationuuid);
            self.list.retain(|s| s.stationuuid != station.stationuuid);
            debug!("favorites: removed {}", station.stationuuid);
            Ok(false)
        } else {
            self.store.add(station).await?;
            self.ids.insert(station.stationuuid.clone());
            self.list.push(station.clone());
            debug!("favorites: added {}", station.stationuuid);
            Ok(true)
        }
    }
}
