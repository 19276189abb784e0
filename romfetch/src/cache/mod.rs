//! TTL-keyed persistence for listing payloads.
//!
//! Each record is a single JSON file under the cache root, named
//! deterministically from its [`CacheKey`]. Record age is the file's
//! modification time, so no sidecar metadata is needed.
//!
//! # Policy
//!
//! - A record is a hit iff its file exists and its age does not exceed the
//!   caller-supplied maximum age.
//! - A record that exists but cannot be read or decoded is logged and treated
//!   as a miss; the next successful fetch overwrites it.
//! - Saves go through a temporary file in the same directory followed by a
//!   rename, so readers never observe a half-written record. Concurrent saves
//!   to the same key are last-writer-wins.

mod key;
mod listing;

use std::path::Path;
use std::time::{Duration, SystemTime};

use thiserror::Error;

pub use key::CacheKey;
pub use listing::{CacheStats, ClearResult, ListingCache};
pub(crate) use listing::write_atomic;

/// Default maximum age for cached listings (24 hours).
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors that can occur while writing or maintaining the cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The payload could not be serialized.
    #[error("failed to serialize cache payload for {key}: {source}")]
    Serialize {
        key: String,
        source: serde_json::Error,
    },

    /// A cache file could not be written.
    #[error("failed to write {path}: {source}")]
    Write {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    /// The cache directory could not be created or listed.
    #[error("failed to access cache directory {path}: {source}")]
    Directory {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
}

/// Age of a file according to its modification time.
///
/// Returns `None` when the file is absent or its metadata is unreadable.
/// A modification time in the future counts as age zero.
pub fn file_age(path: &Path) -> Option<Duration> {
    let modified = path.metadata().and_then(|m| m.modified()).ok()?;
    Some(
        SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO),
    )
}

/// Whether the file at `path` exists and is no older than `max_age`.
pub fn is_fresh(path: &Path, max_age: Duration) -> bool {
    file_age(path).is_some_and(|age| age <= max_age)
}
