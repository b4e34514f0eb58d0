use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::Result;
use crate::system::command::{run, split_nul};

/// Paths known to the version-control system, relative to the repository root.
pub trait VersionControl {
    /// Paths in the current `HEAD` revision.
    fn committed_paths(&self) -> Result<BTreeSet<String>>;

    /// Paths staged for the next commit.
    fn staged_paths(&self) -> Result<BTreeSet<String>>;

    /// Union of committed and staged paths.
    fn tracked_paths(&self) -> Result<BTreeSet<String>> {
        let mut paths = self.committed_paths()?;
        paths.extend(self.staged_paths()?);
        Ok(paths)
    }
}

/// `git` command-line client rooted at a work tree.
#[derive(Debug, Clone)]
pub struct GitCli {
    root: PathBuf,
}

impl GitCli {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn git(&self) -> Command {
        let mut cmd = Command::new("git");
        cmd.current_dir(&self.root);
        cmd
    }

    fn has_head(&self) -> bool {
        let mut cmd = self.git();
        cmd.args(["rev-parse", "--verify", "--quiet", "HEAD"]);
        run(&mut cmd).is_ok()
    }

    /// Stage `paths` for the next commit.
    pub fn stage(&self, paths: &[&Path]) -> Result<()> {
        let mut cmd = self.git();
        cmd.arg("add").arg("--").args(paths);
        run(&mut cmd)?;
        Ok(())
    }
}

impl VersionControl for GitCli {
    fn committed_paths(&self) -> Result<BTreeSet<String>> {
        // A fresh repository has no HEAD and therefore no committed paths.
        if !self.has_head() {
            return Ok(BTreeSet::new());
        }
        let mut cmd = self.git();
        cmd.args(["ls-tree", "-r", "--full-tree", "--name-only", "-z", "HEAD"]);
        let output = run(&mut cmd)?;
        Ok(split_nul(&output.stdout).into_iter().collect())
    }

    fn staged_paths(&self) -> Result<BTreeSet<String>> {
        let mut cmd = self.git();
        cmd.args(["diff", "--cached", "--name-only", "-z"]);
        let output = run(&mut cmd)?;
        Ok(split_nul(&output.stdout).into_iter().collect())
    }
}
