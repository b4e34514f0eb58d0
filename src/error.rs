use std::fmt;
use std::path::PathBuf;

/// Main error type for blobman operations
#[derive(Debug)]
pub enum BlobmanError {
    Io {
        source: std::io::Error,
        context: String,
    },
    /// A persisted record is malformed or cannot be written.
    Config {
        message: String,
        path: Option<PathBuf>,
    },
    /// A required persisted record is absent.
    ConfigMissing {
        path: PathBuf,
    },
    NotARepository {
        start: PathBuf,
    },
    /// Blob patterns resolve to paths that git also tracks or stages.
    Collision {
        paths: Vec<String>,
    },
    /// The backup service failed; persisted state is left as it was.
    Transfer {
        operation: String,
        reason: String,
    },
    UnknownSnapshotTag {
        tag: String,
    },
    /// Checkout without a tag while the lock has never been snapshotted.
    NoSnapshot,
    InvalidPattern {
        pattern: String,
        reason: String,
    },
    NotFound {
        resource: String,
        identifier: String,
    },
    AlreadyExists {
        resource: String,
        identifier: String,
    },
    Command {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },
    TokenSpaceExhausted {
        width: usize,
    },
}

impl fmt::Display for BlobmanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlobmanError::Io { source, context } => {
                write!(f, "IO error during {}: {}", context, source)
            }
            BlobmanError::Config { message, path } => {
                if let Some(path) = path {
                    write!(f, "Configuration error in {}: {}", path.display(), message)
                } else {
                    write!(f, "Configuration error: {}", message)
                }
            }
            BlobmanError::ConfigMissing { path } => {
                write!(
                    f,
                    "file not found {} (run `blobman init` to initialize this repository)",
                    path.display()
                )
            }
            BlobmanError::NotARepository { start } => {
                write!(f, "not a git repository (or any parent up to /): {}", start.display())
            }
            BlobmanError::Collision { paths } => {
                writeln!(f, "collision between git tracked files and blobs")?;
                writeln!(f, "Following files are tracked both by git and blobman:")?;
                for path in paths {
                    writeln!(f, "  {}", path)?;
                }
                write!(f, "Correct the blob patterns or remove these files from git")
            }
            BlobmanError::Transfer { operation, reason } => {
                write!(f, "Backup service failed during {}: {}", operation, reason)
            }
            BlobmanError::UnknownSnapshotTag { tag } => {
                write!(f, "Snapshot tag '{}' not found in the backup repository", tag)
            }
            BlobmanError::NoSnapshot => {
                write!(f, "No snapshot has been taken yet; pass a snapshot tag explicitly")
            }
            BlobmanError::InvalidPattern { pattern, reason } => {
                write!(f, "Invalid pattern '{}': {}", pattern, reason)
            }
            BlobmanError::NotFound { resource, identifier } => {
                write!(f, "{} '{}' not found", resource, identifier)
            }
            BlobmanError::AlreadyExists { resource, identifier } => {
                write!(f, "{} '{}' already exists", resource, identifier)
            }
            BlobmanError::Command { command, exit_code, stderr } => {
                if let Some(code) = exit_code {
                    write!(f, "Command '{}' failed with exit code {}: {}", command, code, stderr)
                } else {
                    write!(f, "Command '{}' failed: {}", command, stderr)
                }
            }
            BlobmanError::TokenSpaceExhausted { width } => {
                write!(f, "Every {}-digit token is already taken", width)
            }
        }
    }
}

impl std::error::Error for BlobmanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BlobmanError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl BlobmanError {
    /// Paths affected by the error, for errors that carry a list.
    pub fn affected_paths(&self) -> &[String] {
        match self {
            BlobmanError::Collision { paths } => paths,
            _ => &[],
        }
    }

    pub(crate) fn transfer(operation: &str, err: BlobmanError) -> Self {
        match err {
            BlobmanError::Transfer { .. } => err,
            other => BlobmanError::Transfer {
                operation: operation.to_string(),
                reason: other.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, BlobmanError>;

pub trait ErrorContext<T> {
    fn with_io_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ErrorContext<T> for std::result::Result<T, std::io::Error> {
    fn with_io_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| BlobmanError::Io {
            source: e,
            context: f(),
        })
    }
}
