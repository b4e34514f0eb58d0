use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::{atomic_write, BlobmanConfig, RepositoryCredentials};
use crate::core::lock::LockState;
use crate::error::{BlobmanError, ErrorContext, Result};

pub const BLOBMAN_DIR: &str = ".blobman";
pub const CONFIG_FILE: &str = "config.json";
pub const LOCK_FILE: &str = "lock.json";
pub const PASSWORD_FILE: &str = "password.txt";
/// Lock record uploaded alongside the blobs of every snapshot.
pub const SNAPSHOT_LOCK_FILE: &str = "snapshot-lock.json";

/// Entries blobman keeps in the repository `.gitignore`.
pub const IGNORED_ENTRIES: [&str; 2] = [".blobman/password.txt", ".blobman/snapshot-lock.json"];

/// Create `path` readable by the owner only and write `content` to it.
fn write_private(path: &Path, content: &str) -> Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options
        .open(path)
        .with_io_context(|| format!("creating {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_io_context(|| format!("writing {}", path.display()))
}

/// Walk up from `start` to the first directory containing `.git`.
pub fn find_repo_root(start: &Path) -> Result<PathBuf> {
    let start = start
        .canonicalize()
        .with_io_context(|| format!("resolving {}", start.display()))?;
    let root = start
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf);
    root.ok_or(BlobmanError::NotARepository { start })
}

/// A git work tree and the blobman files inside it.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Locate the workspace enclosing `start`.
    pub fn discover(start: &Path) -> Result<Self> {
        let root = find_repo_root(start)?;
        debug!(root = %root.display(), "discovered repository root");
        Ok(Self::new(root))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn blobman_dir(&self) -> PathBuf {
        self.root.join(BLOBMAN_DIR)
    }

    pub fn config_path(&self) -> PathBuf {
        self.blobman_dir().join(CONFIG_FILE)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.blobman_dir().join(LOCK_FILE)
    }

    pub fn password_path(&self) -> PathBuf {
        self.blobman_dir().join(PASSWORD_FILE)
    }

    /// Repository-relative path of the staged snapshot lock record.
    pub fn snapshot_lock_rel() -> String {
        format!("{}/{}", BLOBMAN_DIR, SNAPSHOT_LOCK_FILE)
    }

    pub fn gitignore_path(&self) -> PathBuf {
        self.root.join(".gitignore")
    }

    pub fn is_initialized(&self) -> bool {
        self.blobman_dir().exists()
    }

    /// Create `.blobman/` with an empty config and an untagged empty lock.
    pub fn initialize(&self, config: &BlobmanConfig, password: &str) -> Result<()> {
        if self.is_initialized() {
            return Err(BlobmanError::AlreadyExists {
                resource: "blobman repository".to_string(),
                identifier: self.blobman_dir().display().to_string(),
            });
        }

        let dir = self.blobman_dir();
        fs::create_dir_all(&dir)
            .with_io_context(|| format!("creating directory {}", dir.display()))?;
        write_private(&self.password_path(), password)?;
        self.save_config(config)?;
        self.save_lock(&LockState::default())?;
        for entry in IGNORED_ENTRIES {
            ensure_line(&self.gitignore_path(), entry)?;
        }
        Ok(())
    }

    pub fn load_config(&self) -> Result<BlobmanConfig> {
        BlobmanConfig::load(self.config_path())
    }

    pub fn save_config(&self, config: &BlobmanConfig) -> Result<()> {
        config.save(self.config_path())
    }

    pub fn load_lock(&self) -> Result<LockState> {
        let path = self.lock_path();
        if !path.exists() {
            return Err(BlobmanError::ConfigMissing { path });
        }
        let content = fs::read_to_string(&path)
            .with_io_context(|| format!("reading lock file {}", path.display()))?;
        LockState::from_json(&content).map_err(|e| match e {
            BlobmanError::Config { message, .. } => BlobmanError::Config {
                message,
                path: Some(path.clone()),
            },
            other => other,
        })
    }

    /// Persist `lock` with a single atomic replace.
    pub fn save_lock(&self, lock: &LockState) -> Result<()> {
        atomic_write(&self.lock_path(), lock.to_json()?.as_bytes())
    }

    pub fn credentials(&self, config: &BlobmanConfig) -> Result<RepositoryCredentials> {
        let password_file = self.password_path();
        if !password_file.exists() {
            return Err(BlobmanError::ConfigMissing { path: password_file });
        }
        Ok(config.credentials(password_file))
    }
}

/// Append `line` to `file` unless a line with the same trimmed content exists.
pub fn ensure_line(file: &Path, line: &str) -> Result<()> {
    let existing = if file.exists() {
        fs::read_to_string(file).with_io_context(|| format!("reading {}", file.display()))?
    } else {
        String::new()
    };
    if existing.lines().any(|l| l.trim() == line) {
        return Ok(());
    }

    let mut content = existing;
    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content.push_str(line);
    content.push('\n');
    fs::write(file, content).with_io_context(|| format!("updating {}", file.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lock::TrackedFile;
    use tempfile::tempdir;

    fn git_dir() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        dir
    }

    #[test]
    fn test_find_repo_root_from_nested_dir() {
        let dir = git_dir();
        let nested = dir.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();

        let root = find_repo_root(&nested).unwrap();
        assert_eq!(root, dir.path().canonicalize().unwrap());
    }

    #[test]
    fn test_find_repo_root_outside_repo() {
        let dir = tempdir().unwrap();
        // The temp dir itself may sit under a repository on some machines.
        if let Err(err) = find_repo_root(dir.path()) {
            assert!(matches!(err, BlobmanError::NotARepository { .. }));
        }
    }

    #[test]
    fn test_initialize_layout() {
        let dir = git_dir();
        let ws = Workspace::new(dir.path());
        ws.initialize(&BlobmanConfig::new("/srv/restic"), "hunter2").unwrap();

        assert!(ws.is_initialized());
        assert_eq!(fs::read_to_string(ws.password_path()).unwrap(), "hunter2");
        assert_eq!(ws.load_config().unwrap().repository_url, "/srv/restic");
        assert_eq!(ws.load_lock().unwrap(), LockState::default());

        let gitignore = fs::read_to_string(ws.gitignore_path()).unwrap();
        for entry in IGNORED_ENTRIES {
            assert!(gitignore.lines().any(|l| l == entry));
        }

        let err = ws.initialize(&BlobmanConfig::new("/srv/restic"), "x").unwrap_err();
        assert!(matches!(err, BlobmanError::AlreadyExists { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_password_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = git_dir();
        let ws = Workspace::new(dir.path());
        ws.initialize(&BlobmanConfig::new("/srv/restic"), "hunter2").unwrap();

        let mode = fs::metadata(ws.password_path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(fs::read_to_string(ws.password_path()).unwrap(), "hunter2");
    }

    #[test]
    fn test_ensure_line_is_idempotent() {
        let dir = tempdir().unwrap();
        let file = dir.path().join(".gitignore");
        fs::write(&file, "target").unwrap();

        ensure_line(&file, ".blobman/password.txt").unwrap();
        ensure_line(&file, ".blobman/password.txt").unwrap();

        assert_eq!(fs::read_to_string(&file).unwrap(), "target\n.blobman/password.txt\n");
    }

    #[test]
    fn test_lock_missing_and_round_trip() {
        let dir = git_dir();
        let ws = Workspace::new(dir.path());
        assert!(matches!(ws.load_lock(), Err(BlobmanError::ConfigMissing { .. })));

        let lock = LockState::untagged([TrackedFile::new("a.bin", "aaa")]).with_tag("deadbeef");
        ws.save_lock(&lock).unwrap();
        assert_eq!(ws.load_lock().unwrap(), lock);
    }

    #[test]
    fn test_credentials_require_password_file() {
        let dir = git_dir();
        let ws = Workspace::new(dir.path());
        let config = BlobmanConfig::new("/srv/restic");
        assert!(matches!(ws.credentials(&config), Err(BlobmanError::ConfigMissing { .. })));
    }
}
