//! HTTP client for radio-browser.info compatible catalogs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::error::{DirectoryError, Result};
use crate::station::Station;

/// Default public catalog mirror.
pub const DEFAULT_BASE_URL: &str = "https://de1.api.radio-browser.info/json";

/// Default timeout for catalog requests.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Default User-Agent. The catalog operators ask clients to identify
/// themselves so misbehaving ones can be contacted.
pub const DEFAULT_USER_AGENT: &str = concat!("ushki/", env!("CARGO_PKG_VERSION"));

/// Paged access to a station catalog.
///
/// Both queries return stations ordered by descending popularity with broken
/// streams filtered out. [`RadioBrowserClient`] is the production
/// implementation; tests substitute their own.
#[async_trait]
pub trait StationDirectory: Send + Sync {
    /// The `limit` most-clicked stations starting at `offset`.
    async fn top_stations(&self, limit: u32, offset: u32) -> Result<Vec<Station>>;

    /// Stations whose name matches `query`, same ordering and paging.
    async fn search_stations(&self, query: &str, limit: u32, offset: u32)
        -> Result<Vec<Station>>;
}

/// reqwest-backed [`StationDirectory`] against a radio-browser mirror.
///
/// # Example
///
/// ```no_run
/// use ushki_directory::{RadioBrowserClient, StationDirectory};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = RadioBrowserClient::new()?;
///     for station in client.top_stations(10, 0).await? {
///         println!("{} [{}]", station.name, station.country_label());
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RadioBrowserClient {
    client: Client,
    base_url: String,
}

impl RadioBrowserClient {
    /// Client against [`DEFAULT_BASE_URL`] with default settings.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Builder for overriding the mirror, timeout or User-Agent.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch_page(
        &self,
        path: &str,
        name: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Station>> {
        let mut url = Url::parse(&format!("{}/{}", self.base_url, path))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("limit", &limit.to_string())
                .append_pair("offset", &offset.to_string())
                .append_pair("order", "clickcount")
                .append_pair("reverse", "true")
                .append_pair("hidebroken", "true");
            if let Some(name) = name {
                pairs.append_pair("name", name);
            }
        }

        debug!("directory: GET {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DirectoryError::Status(status));
        }

        let stations: Vec<Station> = response.json().await?;
        debug!("directory: {} station(s) at offset {}", stations.len(), offset);
        Ok(stations)
    }
}

#[async_trait]
impl StationDirectory for RadioBrowserClient {
    async fn top_stations(&self, limit: u32, offset: u32) -> Result<Vec<Station>> {
        self.fetch_page("stations", None, limit, offset).await
    }

    async fn search_stations(
        &self,
        query: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Station>> {
        self.fetch_page("stations/search", Some(query), limit, offset)
            .await
    }
}

/// Builder for [`RadioBrowserClient`].
#[derive(Debug)]
pub struct ClientBuilder {
    client: Option<Client>,
    base_url: String,
    user_agent: String,
    request_timeout: Duration,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            client: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a pre-configured `reqwest::Client` (shared pools, proxies).
    /// Overrides the User-Agent and timeout settings below.
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Point at a different mirror (or a test server).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<RadioBrowserClient> {
        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .user_agent(&self.user_agent)
                .timeout(self.request_timeout)
                .build()?,
        };

        Ok(RadioBrowserClient {
            client,
            base_url: self.base_url.trim_end_matches('/').to_string(),
        })
    }
}
