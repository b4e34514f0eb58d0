use std::collections::BTreeSet;

use crate::error::{BlobmanError, Result};

/// Fail with [`BlobmanError::Collision`] if any blob path is also known to git.
///
/// `vcs_files` is the union of committed and staged paths.
pub fn check_disjoint(blob_files: &BTreeSet<String>, vcs_files: &BTreeSet<String>) -> Result<()> {
    let common: Vec<String> = blob_files.intersection(vcs_files).cloned().collect();
    if common.is_empty() {
        Ok(())
    } else {
        Err(BlobmanError::Collision { paths: common })
    }
}
