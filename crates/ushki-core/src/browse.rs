//! Directory browsing: debounced search, paging and refresh.
//!
//! The controller never blocks the owning loop. Debounce timers and page
//! fetches run as spawned tasks that report back through [`BrowseEvent`];
//! the loop feeds those back into [`BrowseController::on_debounce_elapsed`]
//! and [`BrowseController::on_page_fetched`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, warn};

use ushki_directory::{DirectoryError, Station, StationDirectory};

/// What a fetch does with the result list once it lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    /// Replace the list from offset zero (new query or mode).
    Initial,
    /// Replace from offset zero while the current list stays on screen.
    Refresh,
    /// Append the next page.
    More,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseMode {
    /// No usable query: most-clicked stations.
    Top,
    /// Name search with the trimmed query.
    Search,
}

/// Async outcomes the controller reports back into the owning loop.
#[derive(Debug)]
pub enum BrowseEvent {
    /// The debounce timer for query revision `seq` elapsed.
    Debounced { seq: u64 },
    /// A directory page came back.
    PageFetched {
        kind: FetchKind,
        epoch: u64,
        result: Result<Vec<Station>, DirectoryError>,
    },
}

pub struct BrowseController {
    directory: Arc<dyn StationDirectory>,
    page_size: u32,
    debounce: Duration,
    events_tx: mpsc::Sender<BrowseEvent>,

    query: String,
    stations: Vec<Station>,
    offset: u32,
    exhausted: bool,

    loading: bool,
    loading_more: bool,
    refreshing: bool,

    debounce_seq: u64,
    debounce_task: Option<AbortHandle>,
    first_fetch_done: bool,

    /// Bumped on every list-replacing fetch. Pages carrying an older
    /// epoch are dropped.
    epoch: u64,
}

impl BrowseController {
    pub fn new(
        directory: Arc<dyn StationDirectory>,
        page_size: u32,
        debounce: Duration,
        events_tx: mpsc::Sender<BrowseEvent>,
    ) -> Self {
        Self {
            directory,
            page_size,
            debounce,
            events_tx,
            query: String::new(),
            stations: Vec::new(),
            offset: 0,
            exhausted: false,
            loading: false,
            loading_more: false,
            refreshing: false,
            debounce_seq: 0,
            debounce_task: None,
            first_fetch_done: false,
            epoch: 0,
        }
    }

    /// Records a new query and (re)arms the debounce timer. The very first
    /// call fires immediately so startup is not delayed.
    pub fn set_query(&mut self, query: String) {
        self.query = query;
        self.debounce_seq += 1;
        let seq = self.debounce_seq;
        if let Some(task) = self.debounce_task.take() {
            task.abort();
        }
        let delay = if self.first_fetch_done {
            self.debounce
        } else {
            Duration::ZERO
        };
        let tx = self.events_tx.clone();
        let task = tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let _ = tx.send(BrowseEvent::Debounced { seq }).await;
        });
        self.debounce_task = Some(task.abort_handle());
    }

    /// Timer callback. A seq older than the latest means the query changed
    /// again while this timer slept.
    pub fn on_debounce_elapsed(&mut self, seq: u64) {
        if seq != self.debounce_seq {
            debug!("browse: stale debounce seq {} (now {})", seq, self.debounce_seq);
            return;
        }
        self.begin_fetch(FetchKind::Initial);
    }

    /// Requests the next page of the current query.
    pub fn load_more(&mut self) {
        self.begin_fetch(FetchKind::More);
    }

    /// Re-reads the first page from the directory. Takes priority over
    /// paging: any in-flight `More` page lands in a stale epoch.
    pub fn refresh(&mut self) {
        self.begin_fetch(FetchKind::Refresh);
    }

    /// Applies a fetched page. The kind's in-flight flag clears no matter
    /// what; stale epochs and errors leave the list untouched.
    pub fn on_page_fetched(
        &mut self,
        kind: FetchKind,
        epoch: u64,
        result: Result<Vec<Station>, DirectoryError>,
    ) {
        match kind {
            FetchKind::Initial => self.loading = false,
            FetchKind::More => self.loading_more = false,
            FetchKind::Refresh => self.refreshing = false,
        }
        if epoch != self.epoch {
            debug!("browse: dropping page from epoch {} (now {})", epoch, self.epoch);
            return;
        }
        let page = match result {
            Ok(page) => page,
            Err(e) => {
                warn!("browse: {:?} fetch failed: {}", kind, e);
                return;
            }
        };
        debug!("browse: {:?} page with {} stations", kind, page.len());
        let len = page.len() as u32;
        match kind {
            FetchKind::Initial | FetchKind::Refresh => {
                self.stations = page;
                self.offset = len;
            }
            FetchKind::More => {
                self.stations.extend(page);
                self.offset += len;
            }
        }
        self.exhausted = len < self.page_size;
    }

    pub fn mode(&self) -> BrowseMode {
        Self::mode_for(&self.query)
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn loading_more(&self) -> bool {
        self.loading_more
    }

    pub fn refreshing(&self) -> bool {
        self.refreshing
    }

    /// Queries of three or more characters (after trimming) search by name;
    /// anything shorter browses the top list.
    fn mode_for(query: &str) -> BrowseMode {
        if query.trim().chars().count() > 2 {
            BrowseMode::Search
        } else {
            BrowseMode::Top
        }
    }

    fn begin_fetch(&mut self, kind: FetchKind) {
        if self.suppressed(kind) {
            debug!("browse: {:?} fetch suppressed", kind);
            return;
        }
        self.first_fetch_done = true;

        let offset = match kind {
            FetchKind::Initial | FetchKind::Refresh => 0,
            FetchKind::More => self.offset,
        };
        match kind {
            FetchKind::Initial => self.loading = true,
            FetchKind::More => self.loading_more = true,
            FetchKind::Refresh => {
                self.refreshing = true;
                self.exhausted = false;
            }
        }
        if matches!(kind, FetchKind::Initial | FetchKind::Refresh) {
            self.epoch += 1;
        }

        let epoch = self.epoch;
        let mode = self.mode();
        let query = self.query.trim().to_string();
        let limit = self.page_size;
        let directory = self.directory.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = match mode {
                BrowseMode::Top => directory.top_stations(limit, offset).await,
                BrowseMode::Search => directory.search_stations(&query, limit, offset).await,
            };
            let _ = tx.send(BrowseEvent::PageFetched { kind, epoch, result }).await;
        });
    }

    fn suppressed(&self, kind: FetchKind) -> bool {
        match kind {
            FetchKind::Initial => self.loading || self.loading_more || self.refreshing,
            FetchKind::More => {
                self.loading || self.loading_more || self.refreshing || self.exhausted
            }
            FetchKind::Refresh => self.refreshing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_threshold_counts_trimmed_chars() {
        assert_eq!(BrowseController::mode_for(""), BrowseMode::Top);
        assert_eq!(BrowseController::mode_for("ja"), BrowseMode::Top);
        assert_eq!(BrowseController::mode_for("  ja  "), BrowseMode::Top);
        assert_eq!(BrowseController::mode_for("jaz"), BrowseMode::Search);
        // Characters, not bytes: three two-byte chars still search.
        assert_eq!(BrowseController::mode_for("émé"), BrowseMode::Search);
    }
}
