use std::collections::btree_map::{self, BTreeMap};
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{BlobmanError, Result};

/// A blob file identified by its repository-relative path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrackedFile {
    pub path: String,
    pub hash: String,
}

impl TrackedFile {
    pub fn new(path: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            hash: hash.into(),
        }
    }
}

/// On-disk shape of a lock state (`lock.json`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    #[serde(default)]
    pub snapshot_tag: Option<String>,
    #[serde(default)]
    pub tracked_files: Vec<TrackedFile>,
}

/// Point-in-time capture of the blob set, optionally bound to a snapshot tag.
///
/// Files are keyed by path, so a path appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockState {
    snapshot_tag: Option<String>,
    files: BTreeMap<String, String>,
}

impl LockState {
    /// An untagged state, as computed from the worktree.
    pub fn untagged<I>(files: I) -> Self
    where
        I: IntoIterator<Item = TrackedFile>,
    {
        Self {
            snapshot_tag: None,
            files: files.into_iter().map(|f| (f.path, f.hash)).collect(),
        }
    }

    /// A new state carrying `tag` and the files of `self`.
    pub fn with_tag(&self, tag: impl Into<String>) -> Self {
        Self {
            snapshot_tag: Some(tag.into()),
            files: self.files.clone(),
        }
    }

    pub fn snapshot_tag(&self) -> Option<&str> {
        self.snapshot_tag.as_deref()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn hash_of(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Paths in lexicographic order.
    pub fn paths(&self) -> btree_map::Keys<'_, String, String> {
        self.files.keys()
    }

    pub fn path_set(&self) -> BTreeSet<String> {
        self.files.keys().cloned().collect()
    }

    pub fn files(&self) -> impl Iterator<Item = TrackedFile> + '_ {
        self.files.iter().map(|(p, h)| TrackedFile::new(p.clone(), h.clone()))
    }

    /// Same (path, hash) pairs, regardless of tag.
    pub fn is_equivalent(&self, other: &LockState) -> bool {
        self.files == other.files
    }

    pub fn to_record(&self) -> LockRecord {
        LockRecord {
            snapshot_tag: self.snapshot_tag.clone(),
            tracked_files: self.files().collect(),
        }
    }

    /// Build a state from its record, rejecting duplicate paths.
    pub fn from_record(record: LockRecord) -> Result<Self> {
        let mut files = BTreeMap::new();
        for file in record.tracked_files {
            if let Some(previous) = files.insert(file.path.clone(), file.hash) {
                return Err(BlobmanError::Config {
                    message: format!(
                        "lock lists '{}' twice (hashes {} and {})",
                        file.path,
                        previous,
                        files[&file.path]
                    ),
                    path: None,
                });
            }
        }
        Ok(Self {
            snapshot_tag: record.snapshot_tag,
            files,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.to_record()).map_err(|e| BlobmanError::Config {
            message: format!("Failed to serialize lock: {}", e),
            path: None,
        })
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Self::from_slice(content.as_bytes())
    }

    /// Parse a lock record from raw bytes, rejecting invalid UTF-8.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let record: LockRecord = serde_json::from_slice(bytes).map_err(|e| BlobmanError::Config {
            message: format!("Invalid lock record: {}", e),
            path: None,
        })?;
        Self::from_record(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equivalence_ignores_tag() {
        let a = LockState::untagged([TrackedFile::new("x.bin", "aaa")]);
        let b = a.with_tag("t1");
        assert!(a.is_equivalent(&b));
        assert_ne!(a, b);
        assert_eq!(a.snapshot_tag(), None);
        assert_eq!(b.snapshot_tag(), Some("t1"));
    }

    #[test]
    fn test_json_round_trip() {
        let state = LockState::untagged([
            TrackedFile::new("b/y.bin", "bbb"),
            TrackedFile::new("a/x.bin", "aaa"),
        ])
        .with_tag("0badcafe");

        let json = state.to_json().unwrap();
        assert_eq!(LockState::from_json(&json).unwrap(), state);

        let record: LockRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record.tracked_files[0].path, "a/x.bin");
        assert_eq!(record.snapshot_tag.as_deref(), Some("0badcafe"));
    }

    #[test]
    fn test_reads_untagged_record() {
        let json = r#"{ "snapshot_tag": null, "tracked_files": [ { "path": "x.bin", "hash": "aaa" } ] }"#;
        let state = LockState::from_json(json).unwrap();
        assert_eq!(state.snapshot_tag(), None);
        assert_eq!(state.hash_of("x.bin"), Some("aaa"));
    }

    #[test]
    fn test_reads_empty_object() {
        let state = LockState::from_json("{}").unwrap();
        assert!(state.is_empty());
        assert_eq!(state.snapshot_tag(), None);
    }

    #[test]
    fn test_duplicate_paths_rejected() {
        let json = r#"{ "tracked_files": [
            { "path": "x.bin", "hash": "aaa" },
            { "path": "x.bin", "hash": "bbb" }
        ] }"#;
        assert!(LockState::from_json(json).is_err());
    }

    #[test]
    fn test_invalid_utf8_record_rejected() {
        let mut bytes = br#"{"snapshot_tag":"t1","tracked_files":[{"path":"x"#.to_vec();
        bytes.push(0xff);
        bytes.extend_from_slice(br#".bin","hash":"aaa"}]}"#);
        assert!(matches!(
            LockState::from_slice(&bytes),
            Err(BlobmanError::Config { .. })
        ));
    }
}
