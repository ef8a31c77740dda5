//! Station records as served by radio-browser.info compatible catalogs.

use serde::{Deserialize, Serialize};

/// One catalog entry describing an internet radio stream.
///
/// The catalog guarantees very little: beyond `stationuuid`, any field may be
/// absent or empty. Missing fields decode to defaults and render through the
/// display helpers instead of failing.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Station {
    /// Stable unique identifier, the only field identity relies on.
    #[serde(default)]
    pub stationuuid: String,
    #[serde(default)]
    pub name: String,
    /// Country the station broadcasts from; often empty.
    #[serde(default)]
    pub country: String,
    /// Comma-separated free-text tags (genre, language, style).
    #[serde(default)]
    pub tags: String,
    /// Resolved playable stream URL.
    #[serde(default)]
    pub url_resolved: String,
    /// Popularity counter behind the catalog's default ordering.
    #[serde(default)]
    pub clickcount: u64,
}

impl Station {
    pub fn id(&self) -> &str {
        &self.stationuuid
    }

    /// Country for display, `"Unknown"` when the catalog left it empty.
    pub fn country_label(&self) -> &str {
        if self.country.is_empty() {
            "Unknown"
        } else {
            &self.country
        }
    }

    /// Up to `max` trimmed, non-empty tags for display.
    pub fn tag_list(&self, max: usize) -> Vec<&str> {
        self.tags
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .take(max)
            .collect()
    }
}
