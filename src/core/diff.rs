use std::collections::BTreeSet;

use serde::Serialize;

use crate::core::lock::LockState;

/// Classification of every path present in either of two lock states.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LockDiff {
    pub added: BTreeSet<String>,
    pub removed: BTreeSet<String>,
    pub modified: BTreeSet<String>,
    pub unchanged: BTreeSet<String>,
}

impl LockDiff {
    /// True when nothing was added, removed or modified.
    pub fn is_clean(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }
}

/// Compare `src` (baseline) against `dst` (candidate).
///
/// Two states carrying the same snapshot tag are identical by definition:
/// every path of `src` is reported unchanged and hashes are not consulted.
pub fn diff(src: &LockState, dst: &LockState) -> LockDiff {
    if let (Some(a), Some(b)) = (src.snapshot_tag(), dst.snapshot_tag()) {
        if a == b {
            return LockDiff {
                unchanged: src.path_set(),
                ..LockDiff::default()
            };
        }
    }

    let mut out = LockDiff::default();
    for path in src.paths() {
        match (src.hash_of(path), dst.hash_of(path)) {
            (Some(old), Some(new)) if old == new => {
                out.unchanged.insert(path.clone());
            }
            (Some(_), Some(_)) => {
                out.modified.insert(path.clone());
            }
            _ => {
                out.removed.insert(path.clone());
            }
        }
    }
    for path in dst.paths() {
        if !src.contains(path) {
            out.added.insert(path.clone());
        }
    }
    out
}
