//! File-per-key JSON cache.

use std::fs;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

use super::{file_age, CacheError, CacheKey, CacheResult};

/// Outcome of [`ListingCache::clear`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearResult {
    pub files_deleted: usize,
    pub bytes_freed: u64,
}

/// Summary returned by [`ListingCache::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub records: usize,
    pub bytes: u64,
}

/// TTL cache storing one JSON document per key under a root directory.
#[derive(Debug, Clone)]
pub struct ListingCache {
    root: PathBuf,
}

impl ListingCache {
    /// Create a cache rooted at `root`. The directory is created lazily on
    /// the first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the cache.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file backing `key`.
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.file_name())
    }

    /// Load the payload stored under `key` if it is no older than `max_age`.
    ///
    /// Absent, expired and unreadable records are all misses.
    pub fn load<T: DeserializeOwned>(&self, key: &CacheKey, max_age: Duration) -> Option<T> {
        let path = self.path_for(key);

        let age = file_age(&path)?;
        if age > max_age {
            tracing::debug!(key = %key, age_secs = age.as_secs(), "Cache record expired");
            return None;
        }

        let file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Unreadable cache record");
                return None;
            }
        };

        match serde_json::from_reader(BufReader::new(file)) {
            Ok(payload) => {
                tracing::debug!(key = %key, age_secs = age.as_secs(), "Cache hit");
                Some(payload)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Corrupt cache record, ignoring");
                None
            }
        }
    }

    /// Store `payload` under `key`, replacing any previous record.
    pub fn save<T: Serialize + ?Sized>(&self, key: &CacheKey, payload: &T) -> CacheResult<()> {
        let bytes = serde_json::to_vec(payload).map_err(|e| CacheError::Serialize {
            key: key.to_string(),
            source: e,
        })?;

        let path = self.path_for(key);
        write_atomic(&self.root, &path, &bytes)?;

        tracing::debug!(key = %key, bytes = bytes.len(), "Saved cache record");
        Ok(())
    }

    /// Remove every JSON record under the root.
    pub fn clear(&self) -> CacheResult<ClearResult> {
        let mut result = ClearResult::default();
        for (path, len) in self.records()? {
            fs::remove_file(&path).map_err(|e| CacheError::Write {
                path: path.clone(),
                source: e,
            })?;
            result.files_deleted += 1;
            result.bytes_freed += len;
        }
        Ok(result)
    }

    /// Count the JSON records under the root.
    pub fn stats(&self) -> CacheResult<CacheStats> {
        let records = self.records()?;
        Ok(CacheStats {
            records: records.len(),
            bytes: records.iter().map(|(_, len)| len).sum(),
        })
    }

    fn records(&self) -> CacheResult<Vec<(PathBuf, u64)>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(CacheError::Directory {
                    path: self.root.clone(),
                    source: e,
                })
            }
        };

        Ok(entries
            .filter_map(Result::ok)
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "json"))
            .filter_map(|entry| {
                let meta = entry.metadata().ok()?;
                meta.is_file().then(|| (entry.path(), meta.len()))
            })
            .collect())
    }
}

/// Write `bytes` to `path` through a temporary file in `dir` and a rename.
pub(crate) fn write_atomic(dir: &Path, path: &Path, bytes: &[u8]) -> CacheResult<()> {
    fs::create_dir_all(dir).map_err(|e| CacheError::Directory {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let write_err = |e: std::io::Error| CacheError::Write {
        path: path.to_path_buf(),
        source: e,
    };

    let mut temp = NamedTempFile::new_in(dir).map_err(write_err)?;
    temp.write_all(bytes).map_err(write_err)?;
    temp.as_file().sync_all().map_err(write_err)?;
    temp.persist(path).map_err(|e| write_err(e.error))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::{ListingEntry, Region, Source};
    use filetime::FileTime;
    use std::time::SystemTime;
    use tempfile::TempDir;

    const DAY: Duration = Duration::from_secs(86400);

    fn set_age(path: &Path, age: Duration) {
        let when = SystemTime::now() - age;
        filetime::set_file_mtime(path, FileTime::from_system_time(when)).unwrap();
    }

    fn sample_entries() -> Vec<ListingEntry> {
        vec![ListingEntry {
            name: "Sonic (USA).zip".to_string(),
            size: "512.0 KiB".to_string(),
            region: Region::Usa,
            year: String::new(),
            system: "Sega - Mega Drive - Genesis".to_string(),
            url: "https://example.com/Sonic%20(USA).zip".to_string(),
        }]
    }

    #[test]
    fn test_load_missing_is_miss() {
        let temp = TempDir::new().unwrap();
        let cache = ListingCache::new(temp.path());
        let loaded: Option<Vec<String>> = cache.load(&CacheKey::new("nope"), DAY);
        assert!(loaded.is_none());
    }

    #[test]
    fn test_save_then_load_returns_payload() {
        let temp = TempDir::new().unwrap();
        let cache = ListingCache::new(temp.path().join("nested"));
        let key = CacheKey::games(Source::Myrient, "No-Intro", "Sega - Mega Drive - Genesis");

        cache.save(&key, &sample_entries()).unwrap();

        let loaded: Vec<ListingEntry> = cache.load(&key, DAY).unwrap();
        assert_eq!(loaded, sample_entries());
    }

    #[test]
    fn test_ttl_hit_and_miss() {
        let temp = TempDir::new().unwrap();
        let cache = ListingCache::new(temp.path());
        let key = CacheKey::systems(Source::Myrient, "Redump");
        cache.save(&key, &vec!["games".to_string()]).unwrap();

        set_age(&cache.path_for(&key), Duration::from_secs(2 * 3600));
        let hit: Option<Vec<String>> = cache.load(&key, DAY);
        assert_eq!(hit, Some(vec!["games".to_string()]));

        set_age(&cache.path_for(&key), 2 * DAY);
        let miss: Option<Vec<String>> = cache.load(&key, DAY);
        assert!(miss.is_none());
    }

    #[test]
    fn test_corrupt_record_is_miss() {
        let temp = TempDir::new().unwrap();
        let cache = ListingCache::new(temp.path());
        let key = CacheKey::new("broken");
        fs::write(cache.path_for(&key), b"{not json").unwrap();

        let loaded: Option<Vec<String>> = cache.load(&key, DAY);
        assert!(loaded.is_none());
    }

    #[test]
    fn test_save_overwrites_and_leaves_no_temp_files() {
        let temp = TempDir::new().unwrap();
        let cache = ListingCache::new(temp.path());
        let key = CacheKey::new("k");

        cache.save(&key, &vec![1, 2, 3]).unwrap();
        cache.save(&key, &vec![4]).unwrap();

        let loaded: Vec<i32> = cache.load(&key, DAY).unwrap();
        assert_eq!(loaded, vec![4]);
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_clear_and_stats() {
        let temp = TempDir::new().unwrap();
        let cache = ListingCache::new(temp.path());
        cache.save(&CacheKey::new("a"), &vec!["x"]).unwrap();
        cache.save(&CacheKey::new("b"), &vec!["y"]).unwrap();
        fs::create_dir(temp.path().join("libretrodb")).unwrap();

        let stats = cache.stats().unwrap();
        assert_eq!(stats.records, 2);
        assert!(stats.bytes > 0);

        let cleared = cache.clear().unwrap();
        assert_eq!(cleared.files_deleted, 2);
        assert_eq!(cleared.bytes_freed, stats.bytes);
        assert_eq!(cache.stats().unwrap().records, 0);
        assert!(temp.path().join("libretrodb").exists());
    }

    #[test]
    fn test_stats_on_missing_root() {
        let temp = TempDir::new().unwrap();
        let cache = ListingCache::new(temp.path().join("never-created"));
        assert_eq!(cache.stats().unwrap(), CacheStats::default());
    }
}
