//! Deterministic cache keys.

use std::fmt;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::listing::Source;

/// Characters escaped inside a key component. `_` is escaped so it only ever
/// appears as the separator between components.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.');

fn escape(component: &str) -> String {
    utf8_percent_encode(component, COMPONENT).to_string()
}

/// Identifies one cache record.
///
/// Keys are derived from the listing selector so that repeated runs with the
/// same (source, collection[, system]) reuse the same file. Every component
/// is percent-escaped, so distinct selectors never share a key and the key
/// is always a valid single path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Create a single-component key from a raw string.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(escape(raw.as_ref()))
    }

    /// Key for the system list of a collection.
    pub fn systems(source: Source, collection: &str) -> Self {
        Self(format!("{}_systems_{}", source.slug(), escape(collection)))
    }

    /// Key for the game list of one system within a collection.
    pub fn games(source: Source, collection: &str, system: &str) -> Self {
        Self(format!(
            "{}_games_{}_{}",
            source.slug(),
            escape(collection),
            escape(system)
        ))
    }

    /// The escaped key.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the record backing this key.
    pub fn file_name(&self) -> String {
        format!("{}.json", self.0)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
