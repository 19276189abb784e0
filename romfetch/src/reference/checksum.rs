//! Checksum calculation for file identification.
//!
//! All three digests are computed in one pass over the file so large images
//! are read exactly once.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use md5::{Digest, Md5};
use sha1::Sha1;

use super::{ReferenceError, ReferenceResult};

/// Buffer size for reading files during checksum calculation (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Lowercase hex digests of a file's full content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDigests {
    /// CRC32, zero-padded to 8 hex digits.
    pub crc32: String,
    pub md5: String,
    pub sha1: String,
}

impl FileDigests {
    /// Calculate CRC32, MD5 and SHA1 of a file.
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceError::ReadFailed`] if the file cannot be opened or read.
    pub fn compute(path: &Path) -> ReferenceResult<Self> {
        let read_err = |e| ReferenceError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        };

        let mut file = File::open(path).map_err(read_err)?;

        let mut crc = crc32fast::Hasher::new();
        let mut md5 = Md5::new();
        let mut sha1 = Sha1::new();
        let mut buffer = vec![0u8; BUFFER_SIZE];

        loop {
            let bytes_read = file.read(&mut buffer).map_err(read_err)?;
            if bytes_read == 0 {
                break;
            }

            let chunk = &buffer[..bytes_read];
            crc.update(chunk);
            md5.update(chunk);
            sha1.update(chunk);
        }

        Ok(Self {
            crc32: format!("{:08x}", crc.finalize()),
            md5: format!("{:x}", md5.finalize()),
            sha1: format!("{:x}", sha1.finalize()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_known_digests() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("test.txt");

        let mut file = File::create(&file_path).unwrap();
        file.write_all(b"hello world").unwrap();

        let digests = FileDigests::compute(&file_path).unwrap();

        assert_eq!(digests.crc32, "0d4a1185");
        assert_eq!(digests.md5, "5eb63bbbe01eeed093cb22bb8f5acdc3");
        assert_eq!(digests.sha1, "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed");
    }

    #[test]
    fn test_empty_file() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("empty.bin");
        File::create(&file_path).unwrap();

        let digests = FileDigests::compute(&file_path).unwrap();

        assert_eq!(digests.crc32, "00000000");
        assert_eq!(digests.md5, "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(digests.sha1, "da39a3ee5e6b4b0d3255bfef95601890afd80709");
    }

    #[test]
    fn test_nonexistent_file() {
        let result = FileDigests::compute(Path::new("/nonexistent/file.bin"));
        assert!(matches!(result, Err(ReferenceError::ReadFailed { .. })));
    }

    #[test]
    fn test_multi_buffer_file_is_consistent() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("large.bin");
        std::fs::write(&file_path, vec![0xABu8; 200_000]).unwrap();

        let first = FileDigests::compute(&file_path).unwrap();
        let second = FileDigests::compute(&file_path).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.crc32.len(), 8);
        assert_eq!(first.md5.len(), 32);
        assert_eq!(first.sha1.len(), 40);
    }
}
