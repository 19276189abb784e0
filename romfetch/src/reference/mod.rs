//! Reference database ("dat") indexing and content identification.
//!
//! A dat file is a catalogue of canonical game entries with the checksums of
//! their ROM images, in either Logiqx XML or clrmamepro text form. This module downloads and caches dat files
//! per system, indexes them by filename and by each checksum, and resolves a
//! local file to its catalogue entry.
//!
//! - `dat`: parsing into a [`DatIndex`]
//! - `database`: per-system download, cache and in-memory reuse
//! - `checksum`: single-pass CRC32/MD5/SHA1 of a file
//! - `identify`: filename-then-hash resolution

mod checksum;
mod dat;
mod database;
mod entry;
mod identify;

use std::path::PathBuf;

use thiserror::Error;

use crate::cache::CacheError;
use crate::http::HttpError;

pub use checksum::FileDigests;
pub use dat::{parse_dat, DatIndex};
pub use database::{ReferenceDatabase, DEFAULT_DAT_BASE_URL, DEFAULT_FETCH_TIMEOUT};
pub use entry::ReferenceEntry;
pub use identify::{Identification, Identifier, MatchKind};

/// Result type for reference database operations.
pub type ReferenceResult<T> = Result<T, ReferenceError>;

/// Errors that can occur while loading dat files or identifying files.
#[derive(Debug, Error)]
pub enum ReferenceError {
    /// The dat file could not be downloaded.
    #[error("failed to download reference data for {system}: {source}")]
    FetchFailed { system: String, source: HttpError },

    /// The dat URL could not be built.
    #[error("invalid reference URL for {system}: {reason}")]
    InvalidUrl { system: String, reason: String },

    /// The dat file could not be parsed.
    #[error("failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    /// A file could not be read.
    #[error("failed to read {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The downloaded dat file could not be stored.
    #[error(transparent)]
    Store(#[from] CacheError),
}
