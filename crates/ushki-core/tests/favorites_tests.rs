//! Favorites semantics: toggle parity, ordering, failure isolation.

mod common;

use std::sync::Arc;

use common::{make_station, FailingStore};
use ushki_core::storage::{keys, KeyValueStore, MemoryStore};
use ushki_core::{Favorites, FavoritesStore};

#[tokio::test]
async fn test_toggle_twice_returns_to_original_state() {
    let store = Arc::new(MemoryStore::new());
    let mut favorites = Favorites::load(FavoritesStore::new(store.clone())).await;
    let station = make_station("a", "Alpha");

    assert!(!favorites.is_favorite("a"));
    assert!(favorites.toggle(&station).await.unwrap());
    assert!(favorites.is_favorite("a"));
    assert!(!favorites.toggle(&station).await.unwrap());
    assert!(!favorites.is_favorite("a"));
    assert!(favorites.is_empty());

    // The store agrees after both flips.
    let reloaded = Favorites::load(FavoritesStore::new(store)).await;
    assert!(reloaded.is_empty());
}

#[tokio::test]
async fn test_favorites_keep_insertion_order_across_reload() {
    let store = Arc::new(MemoryStore::new());
    let mut favorites = Favorites::load(FavoritesStore::new(store.clone())).await;

    favorites.toggle(&make_station("b", "Beta")).await.unwrap();
    favorites.toggle(&make_station("a", "Alpha")).await.unwrap();
    favorites.toggle(&make_station("c", "Gamma")).await.unwrap();

    let reloaded = Favorites::load(FavoritesStore::new(store)).await;
    let ids: Vec<&str> = reloaded
        .all()
        .iter()
        .map(|s| s.stationuuid.as_str())
        .collect();
    assert_eq!(ids, vec!["b", "a", "c"]);
}

#[tokio::test]
async fn test_failed_add_leaves_memory_and_store_unchanged() {
    let store = Arc::new(FailingStore::new());
    let mut favorites = Favorites::load(FavoritesStore::new(store.clone())).await;

    store.fail_writes();
    let err = favorites.toggle(&make_station("a", "Alpha")).await;
    assert!(err.is_err());
    assert!(!favorites.is_favorite("a"));
    assert!(favorites.is_empty());
}

#[tokio::test]
async fn test_failed_remove_keeps_the_favorite() {
    let store = Arc::new(FailingStore::new());
    let mut favorites = Favorites::load(FavoritesStore::new(store.clone())).await;
    let station = make_station("a", "Alpha");

    favorites.toggle(&station).await.unwrap();
    store.fail_writes();

    assert!(favorites.toggle(&station).await.is_err());
    assert!(favorites.is_favorite("a"));
    assert_eq!(favorites.len(), 1);
}

#[tokio::test]
async fn test_store_add_dedupes_by_uuid() {
    let store = Arc::new(MemoryStore::new());
    let favorites = FavoritesStore::new(store);

    favorites.add(&make_station("a", "Alpha")).await.unwrap();
    favorites.add(&make_station("a", "Alpha renamed")).await.unwrap();

    let all = favorites.load_all().await;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].name, "Alpha");
}

#[tokio::test]
async fn test_corrupt_payload_reads_empty_and_recovers_on_write() {
    let store = Arc::new(MemoryStore::new());
    store.set(keys::FAVORITES, "not json at all").await.unwrap();

    let favorites = FavoritesStore::new(store.clone());
    assert!(favorites.load_all().await.is_empty());

    // Writing through replaces the corrupt payload.
    favorites.add(&make_station("a", "Alpha")).await.unwrap();
    assert_eq!(favorites.load_all().await.len(), 1);
}
