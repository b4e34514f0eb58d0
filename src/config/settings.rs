use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::pattern::PatternSet;
use crate::error::{BlobmanError, ErrorContext, Result};

/// Repository-level configuration, committed to git as `config.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobmanConfig {
    /// Restic repository location (anything `RESTIC_REPOSITORY` accepts).
    pub repository_url: String,
    #[serde(default)]
    pub include_patterns: PatternSet,
}

/// What the backup adapter needs to open the restic repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryCredentials {
    pub repository_url: String,
    /// Git-ignored file holding the restic password.
    pub password_file: PathBuf,
}

impl BlobmanConfig {
    pub fn new(repository_url: impl Into<String>) -> Self {
        Self {
            repository_url: repository_url.into(),
            include_patterns: PatternSet::new(),
        }
    }

    /// Load configuration, failing with `ConfigMissing` if the file is absent.
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Err(BlobmanError::ConfigMissing {
                path: config_path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(config_path)
            .with_io_context(|| format!("reading config file {}", config_path.display()))?;
        Self::from_json(&content).map_err(|e| match e {
            BlobmanError::Config { message, .. } => BlobmanError::Config {
                message,
                path: Some(config_path.to_path_buf()),
            },
            other => other,
        })
    }

    /// Save configuration atomically.
    pub fn save<P: AsRef<Path>>(&self, config_path: P) -> Result<()> {
        let config_path = config_path.as_ref();
        let content = self.to_json()?;
        atomic_write(config_path, content.as_bytes())
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| BlobmanError::Config {
            message: format!("Failed to serialize config: {}", e),
            path: None,
        })
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| BlobmanError::Config {
            message: format!("Invalid JSON: {}", e),
            path: None,
        })
    }

    pub fn credentials(&self, password_file: PathBuf) -> RepositoryCredentials {
        RepositoryCredentials {
            repository_url: self.repository_url.clone(),
            password_file,
        }
    }
}

/// Replace `path` with `data` via a temp file in the same directory, so a
/// crash never leaves a truncated file behind.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path.parent().ok_or_else(|| BlobmanError::Config {
        message: "path has no parent directory".to_string(),
        path: Some(path.to_path_buf()),
    })?;
    fs::create_dir_all(dir)
        .with_io_context(|| format!("creating directory {}", dir.display()))?;

    let temp = tempfile::NamedTempFile::new_in(dir)
        .with_io_context(|| format!("creating temp file in {}", dir.display()))?;
    fs::write(temp.path(), data)
        .with_io_context(|| format!("writing temp file for {}", path.display()))?;
    temp.persist(path).map_err(|e| BlobmanError::Io {
        source: e.error,
        context: format!("replacing {}", path.display()),
    })?;
    Ok(())
}
