use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use crate::cli::ui::create_progress_bar;
use crate::config::RepositoryCredentials;
use crate::core::snapshot::RemoteSnapshotRecord;
use crate::core::workspace::Workspace;
use crate::error::{BlobmanError, ErrorContext, Result};
use crate::system::command::run;

/// Prefix that marks restic tags allocated by blobman.
pub const TAG_PREFIX: &str = "blobman-";

/// The external service that stores blob contents.
///
/// Every method that moves data fails with [`BlobmanError::Transfer`].
pub trait BackupService {
    /// Snapshots carrying a blobman tag.
    fn list_snapshots(&self) -> Result<Vec<RemoteSnapshotRecord>>;

    /// Tags of every blobman snapshot.
    fn list_snapshot_tags(&self) -> Result<BTreeSet<String>> {
        Ok(self.list_snapshots()?.into_iter().map(|r| r.tag).collect())
    }

    /// Capture `files` (repository-relative) under `tag`.
    fn backup_files(&self, files: &[String], tag: &str) -> Result<()>;

    /// Write the snapshot tagged `tag` into `destination`.
    fn restore_snapshot(&self, tag: &str, destination: &Path) -> Result<()>;

    /// Contents of one repository-relative file from the snapshot tagged `tag`.
    fn fetch_file_from_snapshot(&self, tag: &str, path: &str) -> Result<Vec<u8>>;
}

#[derive(Debug, Deserialize)]
struct ResticSnapshot {
    id: String,
    time: DateTime<Utc>,
    #[serde(default)]
    paths: Option<Vec<String>>,
    #[serde(default)]
    tags: Option<Vec<String>>,
}

/// Where a snapshot's files live inside the restic repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotLocation {
    pub id: String,
    /// Absolute work-tree root of the clone that took the snapshot.
    pub root: String,
}

fn parse_snapshots(json: &[u8]) -> Result<Vec<ResticSnapshot>> {
    // Older restic releases print `null` for an empty repository.
    let snapshots: Option<Vec<ResticSnapshot>> =
        serde_json::from_slice(json).map_err(|e| BlobmanError::Transfer {
            operation: "list snapshots".to_string(),
            reason: format!("unexpected restic output: {}", e),
        })?;
    Ok(snapshots.unwrap_or_default())
}

/// The work-tree root a snapshot was taken from.
///
/// Every blobman snapshot includes the staged lock record, so the root is its
/// recorded path minus the record's repository-relative suffix.
pub fn recorded_root(paths: &[String]) -> Option<String> {
    let suffix = format!("/{}", Workspace::snapshot_lock_rel());
    paths.iter().find_map(|p| {
        p.strip_suffix(&suffix).map(|root| {
            if root.is_empty() {
                "/".to_string()
            } else {
                root.to_string()
            }
        })
    })
}

/// Locate the blobman snapshot tagged `tag` in `restic snapshots --json` output.
pub fn locate_snapshot(json: &[u8], tag: &str) -> Result<SnapshotLocation> {
    let wanted = format!("{}{}", TAG_PREFIX, tag);
    let snapshot = parse_snapshots(json)?
        .into_iter()
        .filter(|s| s.tags.iter().flatten().any(|t| *t == wanted))
        .max_by_key(|s| s.time)
        .ok_or_else(|| BlobmanError::UnknownSnapshotTag {
            tag: tag.to_string(),
        })?;

    let paths = snapshot.paths.unwrap_or_default();
    let root = recorded_root(&paths).ok_or_else(|| BlobmanError::Transfer {
        operation: "locate snapshot".to_string(),
        reason: format!("snapshot {} holds no blobman lock record", snapshot.id),
    })?;
    Ok(SnapshotLocation {
        id: snapshot.id,
        root,
    })
}

/// Map `restic snapshots --json` output to blobman snapshot records.
pub fn parse_snapshot_listing(json: &[u8]) -> Result<Vec<RemoteSnapshotRecord>> {
    let mut records = Vec::new();
    for snapshot in parse_snapshots(json)? {
        for tag in snapshot.tags.iter().flatten() {
            if let Some(token) = tag.strip_prefix(TAG_PREFIX) {
                records.push(RemoteSnapshotRecord {
                    tag: token.to_string(),
                    id: snapshot.id.clone(),
                    timestamp: snapshot.time,
                });
            }
        }
    }
    Ok(records)
}

/// `restic` command-line client for one repository.
#[derive(Debug, Clone)]
pub struct ResticCli {
    root: PathBuf,
    credentials: RepositoryCredentials,
}

impl ResticCli {
    pub fn new<P: AsRef<Path>>(root: P, credentials: RepositoryCredentials) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            credentials,
        }
    }

    fn restic(&self) -> Command {
        let mut cmd = Command::new("restic");
        cmd.current_dir(&self.root)
            .env("RESTIC_REPOSITORY", &self.credentials.repository_url)
            .env("RESTIC_PASSWORD_FILE", &self.credentials.password_file)
            .env_remove("RESTIC_PASSWORD");
        cmd
    }

    fn tag_arg(tag: &str) -> String {
        format!("{}{}", TAG_PREFIX, tag)
    }

    fn run_transfer(&self, operation: &str, cmd: &mut Command) -> Result<Output> {
        run(cmd).map_err(|e| BlobmanError::transfer(operation, e))
    }

    /// Snapshot id and recorded root for `tag`.
    fn locate(&self, tag: &str) -> Result<SnapshotLocation> {
        let mut cmd = self.restic();
        cmd.args(["snapshots", "--json", "--tag"]).arg(Self::tag_arg(tag));
        let output = self.run_transfer("locate snapshot", &mut cmd)?;
        let location = locate_snapshot(&output.stdout, tag)?;
        debug!(%tag, id = %location.id, root = %location.root, "located snapshot");
        Ok(location)
    }

    /// Create the restic repository.
    pub fn init_repository(&self) -> Result<()> {
        let pb = create_progress_bar("Initializing restic repository...");
        let mut cmd = self.restic();
        cmd.arg("init");
        let res = self.run_transfer("init", &mut cmd);
        pb.finish_and_clear();
        res.map(|_| ())
    }
}

impl BackupService for ResticCli {
    fn list_snapshots(&self) -> Result<Vec<RemoteSnapshotRecord>> {
        let mut cmd = self.restic();
        cmd.args(["snapshots", "--json"]);
        let output = self.run_transfer("list snapshots", &mut cmd)?;
        parse_snapshot_listing(&output.stdout)
    }

    fn backup_files(&self, files: &[String], tag: &str) -> Result<()> {
        let mut list = tempfile::NamedTempFile::new()
            .with_io_context(|| "creating restic file list".to_string())?;
        for file in files {
            writeln!(list, "{}", file).with_io_context(|| "writing restic file list".to_string())?;
        }
        list.flush()
            .with_io_context(|| "writing restic file list".to_string())?;

        info!(files = files.len(), %tag, "uploading snapshot");
        let pb = create_progress_bar(&format!("Backing up {} files...", files.len()));
        let mut cmd = self.restic();
        cmd.arg("backup")
            .arg("--files-from-verbatim")
            .arg(list.path())
            .arg("--tag")
            .arg(Self::tag_arg(tag));
        let res = self.run_transfer("backup", &mut cmd);
        pb.finish_and_clear();
        res.map(|_| ())
    }

    fn restore_snapshot(&self, tag: &str, destination: &Path) -> Result<()> {
        // Snapshots store absolute paths of the clone that took them; restore
        // the subtree below that root into the local destination.
        let location = self.locate(tag)?;
        let target = format!("{}:{}", location.id, location.root);
        info!(%tag, destination = %destination.display(), "restoring snapshot");
        let pb = create_progress_bar(&format!("Restoring snapshot {}...", tag));
        let mut cmd = self.restic();
        cmd.arg("restore")
            .arg(target)
            .arg("--target")
            .arg(destination);
        let res = self.run_transfer("restore", &mut cmd);
        pb.finish_and_clear();
        res.map(|_| ())
    }

    fn fetch_file_from_snapshot(&self, tag: &str, path: &str) -> Result<Vec<u8>> {
        let location = self.locate(tag)?;
        let recorded = format!("{}/{}", location.root.trim_end_matches('/'), path);
        debug!(%tag, path = %recorded, "fetching file from snapshot");
        let mut cmd = self.restic();
        cmd.arg("dump").arg(&location.id).arg(&recorded);
        let output = self.run_transfer("fetch", &mut cmd)?;
        Ok(output.stdout)
    }
}
