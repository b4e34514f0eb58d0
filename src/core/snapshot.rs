
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BlobmanError, Result};

/// A snapshot the backup repository holds under one of our tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSnapshotRecord {
    pub tag: String,
    /// Backup-service identifier, shown for reference only.
    pub id: String,
    pub timestamp: DateTime<Utc>,
}

/// Snapshot history ordered oldest first.
#[derive(Debug, Clone, Default)]
pub struct SnapshotHistory {
    records: Vec<RemoteSnapshotRecord>,
}

impl SnapshotHistory {
    pub fn new(mut records: Vec<RemoteSnapshotRecord>) -> Self {
        records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.tag.cmp(&b.tag)));
        Self { records }
    }

    pub fn records(&self) -> &[RemoteSnapshotRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Find the record for `tag`, failing with `UnknownSnapshotTag`.
    pub fn find(&self, tag: &str) -> Result<&RemoteSnapshotRecord> {
        self.records
            .iter()
            .find(|r| r.tag == tag)
            .ok_or_else(|| BlobmanError::UnknownSnapshotTag {
                tag: tag.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(tag: &str, secs: i64) -> RemoteSnapshotRecord {
        RemoteSnapshotRecord {
            tag: tag.to_string(),
            id: format!("id-{tag}"),
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
        }
    }

    #[test]
    fn test_history_is_sorted_oldest_first() {
        let history = SnapshotHistory::new(vec![record("b", 20), record("a", 10), record("c", 30)]);
        let tags: Vec<_> = history.records().iter().map(|r| r.tag.as_str()).collect();
        assert_eq!(tags, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_find_unknown_tag() {
        let history = SnapshotHistory::new(vec![record("a", 10)]);
        assert!(history.find("a").is_ok());
        match history.find("zz") {
            Err(BlobmanError::UnknownSnapshotTag { tag }) => assert_eq!(tag, "zz"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
