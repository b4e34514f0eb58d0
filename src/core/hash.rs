use std::fs::File;
use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{ErrorContext, Result};

/// Compute the content hash of a file by streaming it through SHA-256.
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .with_io_context(|| format!("opening {} for hashing", path.display()))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)
        .with_io_context(|| format!("hashing {}", path.display()))?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Compute hash for in-memory content
pub fn compute_content_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_file_hash_matches_content_hash() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        fs::write(&path, b"hello world").unwrap();

        let from_file = compute_file_hash(&path).unwrap();
        assert_eq!(from_file, compute_content_hash(b"hello world"));
        assert_eq!(
            from_file,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_file_hash_changes_with_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        fs::write(&path, b"one").unwrap();
        let first = compute_file_hash(&path).unwrap();
        fs::write(&path, b"two").unwrap();
        assert_ne!(first, compute_file_hash(&path).unwrap());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        assert!(compute_file_hash(&dir.path().join("absent")).is_err());
    }
}
