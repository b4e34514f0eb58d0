//! Reconciliation of the worktree, the persisted lock and remote snapshots.
//!
//! The persisted lock is only replaced after the backup service has
//! confirmed a transfer. A failed snapshot or checkout leaves it as it was.

use std::collections::BTreeSet;
use std::fmt;
use std::io;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::{atomic_write, BlobmanConfig};
use crate::core::collision::check_disjoint;
use crate::core::diff::{diff, LockDiff};
use crate::core::hash::compute_file_hash;
use crate::core::lock::{LockState, TrackedFile};
use crate::core::pattern::{resolve, PatternSet};
use crate::core::snapshot::{RemoteSnapshotRecord, SnapshotHistory};
use crate::core::tag::allocate_snapshot_tag;
use crate::core::workspace::Workspace;
use crate::error::{BlobmanError, Result};
use crate::system::{BackupService, VersionControl};

/// How the worktree relates to the persisted lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorktreeStatus {
    /// Worktree matches the persisted lock.
    Clean,
    /// Worktree matches neither the persisted lock nor the addressed snapshot.
    Dirty,
    /// Worktree matches the addressed snapshot rather than the persisted lock.
    Detached { tag: String },
}

impl fmt::Display for WorktreeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorktreeStatus::Clean => write!(f, "clean"),
            WorktreeStatus::Dirty => write!(f, "dirty"),
            WorktreeStatus::Detached { tag } => write!(f, "detached at {}", tag),
        }
    }
}

/// Result of a successful snapshot commit.
#[derive(Debug, Clone)]
pub struct SnapshotCommit {
    pub lock: LockState,
    pub diff: LockDiff,
}

/// What a checkout of `record` would change in the worktree.
#[derive(Debug, Clone)]
pub struct CheckoutPlan {
    pub record: RemoteSnapshotRecord,
    pub diff: LockDiff,
}

pub struct ReconciliationService<V, B> {
    workspace: Workspace,
    patterns: PatternSet,
    persisted: LockState,
    vcs: V,
    backup: B,
}

/// Hash `files` below `root`. Files removed since resolution are dropped,
/// the same as the resolver drops vanished candidates.
fn hash_files(root: &Path, files: BTreeSet<String>) -> Result<LockState> {
    let mut tracked = Vec::with_capacity(files.len());
    for path in files {
        match compute_file_hash(&root.join(&path)) {
            Ok(hash) => tracked.push(TrackedFile::new(path, hash)),
            Err(BlobmanError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                debug!(%path, "blob vanished before hashing");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(LockState::untagged(tracked))
}

impl<V: VersionControl, B: BackupService> ReconciliationService<V, B> {
    pub fn new(
        workspace: Workspace,
        patterns: PatternSet,
        persisted: LockState,
        vcs: V,
        backup: B,
    ) -> Self {
        Self {
            workspace,
            patterns,
            persisted,
            vcs,
            backup,
        }
    }

    /// Build a service from the config and lock persisted in `workspace`.
    pub fn open(workspace: Workspace, config: &BlobmanConfig, vcs: V, backup: B) -> Result<Self> {
        let persisted = workspace.load_lock()?;
        Ok(Self::new(
            workspace,
            config.include_patterns.clone(),
            persisted,
            vcs,
            backup,
        ))
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn persisted(&self) -> &LockState {
        &self.persisted
    }

    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    /// Files the registered patterns currently resolve to.
    pub fn resolved_files(&self) -> Result<BTreeSet<String>> {
        resolve(self.workspace.root(), self.patterns.globs())
    }

    /// Hash every resolved file into a fresh, untagged state.
    pub fn worktree_state(&self) -> Result<LockState> {
        hash_files(self.workspace.root(), self.resolved_files()?)
    }

    /// Fail if any of `files` is committed or staged in git.
    pub fn check_collisions(&self, files: &BTreeSet<String>) -> Result<()> {
        let tracked = self.vcs.tracked_paths()?;
        check_disjoint(files, &tracked).map_err(|e| {
            warn!(paths = ?e.affected_paths(), "blob patterns collide with git");
            e
        })
    }

    /// Compare the worktree with the persisted lock, and with `target` if given.
    pub fn status(&self, target: Option<&str>) -> Result<WorktreeStatus> {
        self.status_of(&self.worktree_state()?, target)
    }

    /// Like [`status`](Self::status), for an already hashed worktree.
    pub fn status_of(&self, worktree: &LockState, target: Option<&str>) -> Result<WorktreeStatus> {
        if let Some(tag) = target.filter(|t| Some(*t) != self.persisted.snapshot_tag()) {
            let record = self.resolve_target(Some(tag))?;
            let remote = self.fetch_remote_lock(&record.tag)?;
            if worktree.is_equivalent(&remote) {
                return Ok(WorktreeStatus::Detached { tag: record.tag });
            }
        }

        if worktree.is_equivalent(&self.persisted) {
            Ok(WorktreeStatus::Clean)
        } else {
            Ok(WorktreeStatus::Dirty)
        }
    }

    /// What `commit_snapshot` would record, relative to the persisted lock.
    pub fn plan_snapshot(&self) -> Result<LockDiff> {
        let worktree = self.worktree_state()?;
        self.check_collisions(&worktree.path_set())?;
        Ok(diff(&self.persisted, &worktree))
    }

    /// Upload the worktree blobs under a new tag and persist the tagged lock.
    pub fn commit_snapshot(&mut self) -> Result<SnapshotCommit> {
        let worktree = self.worktree_state()?;
        self.check_collisions(&worktree.path_set())?;
        let changes = diff(&self.persisted, &worktree);

        let existing = self.backup.list_snapshot_tags()?;
        let tag = allocate_snapshot_tag(&existing)?;
        let candidate = worktree.with_tag(&tag);
        info!(%tag, files = candidate.len(), "committing snapshot");

        // The lock record travels with the blobs so checkout can read it back.
        let record_rel = Workspace::snapshot_lock_rel();
        atomic_write(
            &self.workspace.root().join(&record_rel),
            candidate.to_json()?.as_bytes(),
        )?;

        let mut files: Vec<String> = candidate.paths().cloned().collect();
        files.push(record_rel);
        self.backup
            .backup_files(&files, &tag)
            .map_err(|e| BlobmanError::transfer("backup", e))?;

        self.workspace.save_lock(&candidate)?;
        self.persisted = candidate.clone();
        Ok(SnapshotCommit {
            lock: candidate,
            diff: changes,
        })
    }

    /// Resolve `target` (default: the persisted tag) to a remote snapshot.
    pub fn resolve_target(&self, target: Option<&str>) -> Result<RemoteSnapshotRecord> {
        let tag = target
            .or_else(|| self.persisted.snapshot_tag())
            .ok_or(BlobmanError::NoSnapshot)?;
        let history = self.history()?;
        history.find(tag).cloned()
    }

    /// Read the lock record stored inside the snapshot tagged `tag`.
    pub fn fetch_remote_lock(&self, tag: &str) -> Result<LockState> {
        let bytes = self
            .backup
            .fetch_file_from_snapshot(tag, &Workspace::snapshot_lock_rel())
            .map_err(|e| BlobmanError::transfer("fetch lock record", e))?;
        let remote = LockState::from_slice(&bytes).map_err(|e| BlobmanError::Transfer {
            operation: "fetch lock record".to_string(),
            reason: format!("snapshot {} holds an unreadable lock record: {}", tag, e),
        })?;

        match remote.snapshot_tag() {
            Some(t) if t == tag => Ok(remote),
            other => {
                debug!(%tag, recorded = ?other, "lock record carries a different tag");
                Ok(remote.with_tag(tag))
            }
        }
    }

    /// What checking out `target` would overwrite locally.
    ///
    /// The worktree is the baseline and the snapshot the candidate.
    pub fn plan_checkout(&self, target: Option<&str>) -> Result<CheckoutPlan> {
        let record = self.resolve_target(target)?;
        let remote = self.fetch_remote_lock(&record.tag)?;
        let worktree = self.worktree_state()?;
        Ok(CheckoutPlan {
            diff: diff(&worktree, &remote),
            record,
        })
    }

    /// Restore `target` into the worktree and adopt its lock record.
    pub fn commit_checkout(&mut self, target: Option<&str>) -> Result<LockState> {
        let record = self.resolve_target(target)?;
        let remote = self.fetch_remote_lock(&record.tag)?;

        info!(tag = %record.tag, "checking out snapshot");
        self.backup
            .restore_snapshot(&record.tag, self.workspace.root())
            .map_err(|e| BlobmanError::transfer("restore", e))?;

        self.workspace.save_lock(&remote)?;
        self.persisted = remote.clone();
        Ok(remote)
    }

    /// Snapshots recorded in the backup repository, oldest first.
    pub fn history(&self) -> Result<SnapshotHistory> {
        Ok(SnapshotHistory::new(self.backup.list_snapshots()?))
    }
}
