//! Per-system dat download, caching and in-memory reuse.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use url::Url;

use super::dat::parse_dat;
use super::{DatIndex, ReferenceError, ReferenceResult};
use crate::cache::{is_fresh, write_atomic};
use crate::http::HttpClient;

/// Default location of per-system dat files.
pub const DEFAULT_DAT_BASE_URL: &str =
    "https://raw.githubusercontent.com/libretro/libretro-database/master/dat/";

/// Default timeout for a dat download.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Subdirectory of the cache root holding dat files.
const DAT_CACHE_DIR: &str = "libretrodb";

/// Downloads, caches and indexes reference dat files.
///
/// Parsed indexes are kept in memory for the lifetime of the database, so
/// repeated identification within the TTL window neither re-downloads nor
/// re-parses.
pub struct ReferenceDatabase {
    client: Arc<dyn HttpClient>,
    dat_dir: PathBuf,
    base_url: String,
    fetch_timeout: Duration,
    loaded: Mutex<HashMap<String, Arc<DatIndex>>>,
}

impl ReferenceDatabase {
    /// Create a database caching dat files under `<cache_root>/libretrodb`.
    pub fn new(client: Arc<dyn HttpClient>, cache_root: &Path) -> Self {
        Self {
            client,
            dat_dir: cache_root.join(DAT_CACHE_DIR),
            base_url: DEFAULT_DAT_BASE_URL.to_string(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            loaded: Mutex::new(HashMap::new()),
        }
    }

    /// Use a different dat repository.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the dat download timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Path of the cached dat file for `system`.
    pub fn dat_path(&self, system: &str) -> PathBuf {
        self.dat_dir.join(format!("{}.dat", system))
    }

    /// Remote URL of the dat file for `system`.
    pub fn dat_url(&self, system: &str) -> ReferenceResult<Url> {
        let invalid = |reason: String| ReferenceError::InvalidUrl {
            system: system.to_string(),
            reason,
        };
        let base = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        base.join(&format!("./{}.dat", system))
            .map_err(|e| invalid(e.to_string()))
    }

    /// Return the index for `system`, downloading its dat file first when the
    /// cached copy is missing or older than `max_age`.
    ///
    /// # Errors
    ///
    /// A failed download (including a non-success HTTP status) is fatal here,
    /// as is a dat file that cannot be parsed. A file that fails to parse is
    /// removed so the next call fetches a fresh copy.
    pub fn ensure(&self, system: &str, max_age: Duration) -> ReferenceResult<Arc<DatIndex>> {
        let path = self.dat_path(system);

        if !is_fresh(&path, max_age) {
            self.download(system, &path)?;
            self.loaded.lock().remove(system);
        }

        if let Some(index) = self.loaded.lock().get(system) {
            return Ok(Arc::clone(index));
        }

        let index = Arc::new(self.parse_file(&path)?);
        tracing::info!(system, entries = index.len(), "Loaded reference database");
        self.loaded
            .lock()
            .insert(system.to_string(), Arc::clone(&index));
        Ok(index)
    }

    fn download(&self, system: &str, path: &Path) -> ReferenceResult<()> {
        let url = self.dat_url(system)?;
        tracing::info!(system, url = %url, "Downloading reference dat");

        let body = self
            .client
            .get(url.as_str(), self.fetch_timeout)
            .map_err(|e| ReferenceError::FetchFailed {
                system: system.to_string(),
                source: e,
            })?;

        write_atomic(&self.dat_dir, path, &body)?;
        tracing::debug!(system, bytes = body.len(), path = %path.display(), "Cached reference dat");
        Ok(())
    }

    fn parse_file(&self, path: &Path) -> ReferenceResult<DatIndex> {
        let bytes = fs::read(path).map_err(|e| ReferenceError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        parse_dat(&String::from_utf8_lossy(&bytes)).map_err(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Discarding unparseable dat file");
            fs::remove_file(path).ok();
            ReferenceError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })
    }
}

impl std::fmt::Debug for ReferenceDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceDatabase")
            .field("dat_dir", &self.dat_dir)
            .field("base_url", &self.base_url)
            .field("fetch_timeout", &self.fetch_timeout)
            .finish_non_exhaustive()
    }
}
