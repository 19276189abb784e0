//! Catalogue entry type.

use serde::{Deserialize, Serialize};

use super::FileDigests;

/// One game from a reference dat file.
///
/// Checksums are stored as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub name: String,
    pub description: Option<String>,
    pub year: Option<String>,
    pub manufacturer: Option<String>,
    pub crc: Option<String>,
    pub md5: Option<String>,
    pub sha1: Option<String>,
}

impl ReferenceEntry {
    /// Whether `digests` agree with every checksum this entry carries.
    ///
    /// An entry without any checksum never matches.
    pub fn matches(&self, digests: &FileDigests) -> bool {
        let pairs = [
            (self.crc.as_deref(), digests.crc32.as_str()),
            (self.md5.as_deref(), digests.md5.as_str()),
            (self.sha1.as_deref(), digests.sha1.as_str()),
        ];

        let mut compared = false;
        for (expected, actual) in pairs {
            if let Some(expected) = expected {
                if !expected.eq_ignore_ascii_case(actual) {
                    return false;
                }
                compared = true;
            }
        }
        compared
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digests() -> FileDigests {
        FileDigests {
            crc32: "0d4a1185".to_string(),
            md5: "5eb63bbbe01eeed093cb22bb8f5acdc3".to_string(),
            sha1: "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed".to_string(),
        }
    }

    fn entry(crc: Option<&str>, md5: Option<&str>, sha1: Option<&str>) -> ReferenceEntry {
        ReferenceEntry {
            name: "Test".to_string(),
            description: None,
            year: None,
            manufacturer: None,
            crc: crc.map(str::to_string),
            md5: md5.map(str::to_string),
            sha1: sha1.map(str::to_string),
        }
    }

    #[test]
    fn test_matches_all_present_hashes() {
        let e = entry(
            Some("0d4a1185"),
            Some("5eb63bbbe01eeed093cb22bb8f5acdc3"),
            Some("2aae6c35c94fcfb415dbe95f408b9ce91ee846ed"),
        );
        assert!(e.matches(&digests()));
    }

    #[test]
    fn test_matches_partial_entry() {
        assert!(entry(Some("0D4A1185"), None, None).matches(&digests()));
    }

    #[test]
    fn test_mismatch_on_any_hash() {
        let e = entry(Some("0d4a1185"), Some("ffffffffffffffffffffffffffffffff"), None);
        assert!(!e.matches(&digests()));
    }

    #[test]
    fn test_entry_without_hashes_never_matches() {
        assert!(!entry(None, None, None).matches(&digests()));
    }
}
