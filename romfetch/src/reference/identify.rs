//! Resolving local files to reference entries.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::{FileDigests, ReferenceDatabase, ReferenceEntry, ReferenceResult};
use crate::cache::DEFAULT_MAX_AGE;

/// Which lookup produced an identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchKind {
    Filename,
    Crc32,
    Md5,
    Sha1,
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MatchKind::Filename => "filename",
            MatchKind::Crc32 => "CRC32",
            MatchKind::Md5 => "MD5",
            MatchKind::Sha1 => "SHA1",
        };
        f.write_str(label)
    }
}

/// A successful identification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identification {
    pub entry: ReferenceEntry,
    pub matched_by: MatchKind,
}

/// Identifies local files against per-system reference databases.
#[derive(Debug, Clone)]
pub struct Identifier {
    database: Arc<ReferenceDatabase>,
    max_age: Duration,
}

impl Identifier {
    pub fn new(database: Arc<ReferenceDatabase>) -> Self {
        Self {
            database,
            max_age: DEFAULT_MAX_AGE,
        }
    }

    /// Maximum age of a cached dat file before it is downloaded again.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn database(&self) -> &ReferenceDatabase {
        &self.database
    }

    /// Look `path` up in the reference data for `system`.
    ///
    /// The file's base name is tried first. Only when that misses is the file
    /// read and its CRC32, MD5 and SHA1 checked, in that order. `Ok(None)`
    /// means nothing matched.
    ///
    /// # Errors
    ///
    /// Fails if the dat file cannot be obtained or the local file cannot be read.
    pub fn identify(&self, path: &Path, system: &str) -> ReferenceResult<Option<Identification>> {
        let index = self.database.ensure(system, self.max_age)?;

        let base_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let Some(entry) = index.by_filename(&base_name) {
            tracing::debug!(path = %path.display(), system, "Identified by filename");
            return Ok(Some(Identification {
                entry: entry.clone(),
                matched_by: MatchKind::Filename,
            }));
        }

        let digests = FileDigests::compute(path)?;
        let found = index
            .by_crc(&digests.crc32)
            .map(|e| (e, MatchKind::Crc32))
            .or_else(|| index.by_md5(&digests.md5).map(|e| (e, MatchKind::Md5)))
            .or_else(|| index.by_sha1(&digests.sha1).map(|e| (e, MatchKind::Sha1)));

        match found {
            Some((entry, matched_by)) => {
                tracing::debug!(path = %path.display(), system, %matched_by, "Identified by checksum");
                Ok(Some(Identification {
                    entry: entry.clone(),
                    matched_by,
                }))
            }
            None => {
                tracing::debug!(path = %path.display(), system, crc = %digests.crc32, "No reference match");
                Ok(None)
            }
        }
    }

    /// Post-hoc check that the file at `path` carries `entry`'s checksums.
    pub fn verify(&self, path: &Path, entry: &ReferenceEntry) -> ReferenceResult<bool> {
        let digests = FileDigests::compute(path)?;
        Ok(entry.matches(&digests))
    }
}
