//! Remote listing adapters.
//!
//! Turns a (source, collection, system) selector into normalized
//! [`ListingEntry`] values. Each supported site is one variant of
//! [`SiteAdapter`], and all variants share the cache-then-fetch discipline
//! implemented by [`ListingContext`].
//!
//! # Architecture
//!
//! ```text
//! SiteAdapter (enum, implements ListingSource)
//!         │
//!         ├── MyrientAdapter   (directory-index HTML)
//!         └── HShopAdapter     (card / table HTML)
//!                 │
//!                 └── ListingContext
//!                         ├── Arc<dyn HttpClient>
//!                         └── ListingCache
//! ```
//!
//! Network and parse failures never reach the caller: they are logged and the
//! operation yields an empty sequence.

mod hshop;
mod myrient;
mod parse;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::{CacheKey, ListingCache, DEFAULT_MAX_AGE};
use crate::http::{HttpClient, HttpError};

pub use hshop::HShopAdapter;
pub use myrient::MyrientAdapter;
pub use parse::{extract_year, system_display_name, Region};

/// A downloadable entry discovered on a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    pub name: String,
    /// Size as displayed by the site (e.g. `"1.2 MiB"`), `"?"` when unknown.
    pub size: String,
    pub region: Region,
    /// Four-digit year. Empty for Myrient names without one, `"?"` on hShop.
    pub year: String,
    /// Decoded system name (`Sega - 32X`), as used by reference dat files.
    pub system: String,
    /// Absolute download URL.
    pub url: String,
}

/// Supported listing sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Myrient,
    HShop,
}

impl Source {
    /// Every supported source.
    pub const ALL: [Source; 2] = [Source::Myrient, Source::HShop];

    /// Stable lowercase identifier used in cache keys.
    pub fn slug(self) -> &'static str {
        match self {
            Source::Myrient => "myrient",
            Source::HShop => "hshop",
        }
    }

    /// Known collections and their index URLs.
    pub fn collections(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Source::Myrient => &[
                ("No-Intro", "https://myrient.erista.me/files/No-Intro/"),
                ("Redump", "https://myrient.erista.me/files/Redump/"),
                ("Internet Archive", "https://myrient.erista.me/files/Internet Archive/"),
                ("Miscellaneous", "https://myrient.erista.me/files/Miscellaneous/"),
                ("TOSEC", "https://myrient.erista.me/files/TOSEC/"),
                ("TOSEC-ISO", "https://myrient.erista.me/files/TOSEC-ISO/"),
                ("TOSEC-PIX", "https://myrient.erista.me/files/TOSEC-PIX/"),
            ],
            Source::HShop => &[("3DS", "https://hshop.erista.me/")],
        }
    }

    /// Index URL of a collection, if the collection is known.
    pub fn collection_url(self, collection: &str) -> Option<&'static str> {
        self.collections()
            .iter()
            .find(|(name, _)| *name == collection)
            .map(|(_, url)| *url)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Myrient => f.write_str("Myrient"),
            Source::HShop => f.write_str("hShop"),
        }
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "myrient" => Ok(Source::Myrient),
            "hshop" => Ok(Source::HShop),
            other => Err(format!("unknown source '{}'", other)),
        }
    }
}

/// Timeouts and TTL applied to listing fetches.
#[derive(Debug, Clone)]
pub struct ListingConfig {
    /// Timeout for a collection index (system list) fetch.
    pub systems_timeout: Duration,
    /// Timeout for a system index (game list) fetch.
    pub games_timeout: Duration,
    /// Maximum age of a cached listing before it is refetched.
    pub max_age: Duration,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            systems_timeout: Duration::from_secs(10),
            games_timeout: Duration::from_secs(15),
            max_age: DEFAULT_MAX_AGE,
        }
    }
}

impl ListingConfig {
    /// Set the cache TTL.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Set the system-list fetch timeout.
    pub fn with_systems_timeout(mut self, timeout: Duration) -> Self {
        self.systems_timeout = timeout;
        self
    }

    /// Set the game-list fetch timeout.
    pub fn with_games_timeout(mut self, timeout: Duration) -> Self {
        self.games_timeout = timeout;
        self
    }
}

/// Internal failure while producing a listing; logged, never returned.
#[derive(Debug, Error)]
pub(crate) enum ListingError {
    #[error("unknown collection '{0}'")]
    UnknownCollection(String),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("invalid URL {url}: {reason}")]
    Url { url: String, reason: String },
}

/// Capability shared by every listing source.
pub trait ListingSource {
    /// The site this adapter reads.
    fn source(&self) -> Source;

    /// Subdirectory (system) identifiers of a collection.
    fn list_systems(&self, collection: &str) -> Vec<String>;

    /// Entries listed for one system of a collection.
    fn list_games(&self, collection: &str, system: &str) -> Vec<ListingEntry>;
}

/// Client and cache shared by the adapters.
#[derive(Clone)]
pub struct ListingContext {
    client: Arc<dyn HttpClient>,
    cache: ListingCache,
    config: ListingConfig,
}

impl ListingContext {
    pub fn new(client: Arc<dyn HttpClient>, cache: ListingCache, config: ListingConfig) -> Self {
        Self {
            client,
            cache,
            config,
        }
    }

    pub fn config(&self) -> &ListingConfig {
        &self.config
    }

    /// Fetch a page as (lossily decoded) UTF-8 text.
    pub(crate) fn fetch_page(&self, url: &str, timeout: Duration) -> Result<String, ListingError> {
        tracing::info!(url, "Requesting listing page");
        let body = self.client.get(url, timeout)?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// Return the cached payload for `key`, or run `fetch`, cache its result
    /// and return it. A failed fetch is logged and yields an empty list.
    pub(crate) fn cached<T, F>(&self, key: &CacheKey, fetch: F) -> Vec<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<Vec<T>, ListingError>,
    {
        if let Some(cached) = self.cache.load::<Vec<T>>(key, self.config.max_age) {
            return cached;
        }

        match fetch() {
            Ok(items) => {
                tracing::info!(key = %key, count = items.len(), "Fetched listing");
                if let Err(e) = self.cache.save(key, &items) {
                    tracing::warn!(key = %key, error = %e, "Failed to cache listing");
                }
                items
            }
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Error fetching listing");
                Vec::new()
            }
        }
    }
}

impl fmt::Debug for ListingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListingContext")
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// One listing adapter per supported site.
#[derive(Debug, Clone)]
pub enum SiteAdapter {
    Myrient(MyrientAdapter),
    HShop(HShopAdapter),
}

impl SiteAdapter {
    /// Build the adapter for `source`.
    pub fn new(source: Source, context: ListingContext) -> Self {
        match source {
            Source::Myrient => SiteAdapter::Myrient(MyrientAdapter::new(context)),
            Source::HShop => SiteAdapter::HShop(HShopAdapter::new(context)),
        }
    }
}

impl ListingSource for SiteAdapter {
    fn source(&self) -> Source {
        match self {
            SiteAdapter::Myrient(a) => a.source(),
            SiteAdapter::HShop(a) => a.source(),
        }
    }

    fn list_systems(&self, collection: &str) -> Vec<String> {
        match self {
            SiteAdapter::Myrient(a) => a.list_systems(collection),
            SiteAdapter::HShop(a) => a.list_systems(collection),
        }
    }

    fn list_games(&self, collection: &str, system: &str) -> Vec<ListingEntry> {
        match self {
            SiteAdapter::Myrient(a) => a.list_games(collection, system),
            SiteAdapter::HShop(a) => a.list_games(collection, system),
        }
    }
}
