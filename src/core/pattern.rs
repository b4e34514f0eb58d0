//! Blob patterns and their resolution to concrete files.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Component, Path, PathBuf};

use glob::{MatchOptions, Pattern as GlobPattern};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::tag::TokenAllocator;
use crate::error::{BlobmanError, Result};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

/// A registered glob with its stable removal handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub id: String,
    pub glob: String,
}

/// Registered patterns keyed by id. Globs are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatternSet {
    patterns: BTreeMap<String, String>,
}

impl PatternSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Pattern> + '_ {
        self.patterns.iter().map(|(id, glob)| Pattern {
            id: id.clone(),
            glob: glob.clone(),
        })
    }

    pub fn globs(&self) -> impl Iterator<Item = &str> {
        self.patterns.values().map(String::as_str)
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.patterns.get(id).map(String::as_str)
    }

    pub fn id_of(&self, glob: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|(_, g)| g.as_str() == glob)
            .map(|(id, _)| id.as_str())
    }

    /// Register `glob`, returning its id and whether it was newly inserted.
    ///
    /// Re-adding a known glob returns the existing id.
    pub fn add(&mut self, glob: &str) -> Result<(String, bool)> {
        validate_glob(glob)?;
        if let Some(id) = self.id_of(glob) {
            return Ok((id.to_string(), false));
        }

        let taken: BTreeSet<String> = self.patterns.keys().cloned().collect();
        let id = TokenAllocator::default().allocate(&taken)?;
        self.patterns.insert(id.clone(), glob.to_string());
        Ok((id, true))
    }

    /// Unregister the pattern with `id`, returning its glob.
    pub fn remove(&mut self, id: &str) -> Result<String> {
        self.patterns.remove(id).ok_or_else(|| BlobmanError::NotFound {
            resource: "pattern".to_string(),
            identifier: id.to_string(),
        })
    }
}

/// Reject globs that do not parse or that could escape the repository.
pub fn validate_glob(glob: &str) -> Result<()> {
    let invalid = |reason: &str| BlobmanError::InvalidPattern {
        pattern: glob.to_string(),
        reason: reason.to_string(),
    };

    if glob.trim().is_empty() {
        return Err(invalid("pattern is empty"));
    }
    GlobPattern::new(glob).map_err(|e| invalid(e.msg))?;

    let path = Path::new(glob);
    if path.has_root() || glob.starts_with('/') {
        return Err(invalid("pattern must be relative to the repository root"));
    }
    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(invalid("pattern must not contain '..'"));
    }
    Ok(())
}

/// Expand `globs` under `root` into the sorted set of regular files they name.
///
/// Directories that match are expanded recursively. Symlinks, sockets and
/// anything that vanishes during resolution are left out.
pub fn resolve<'a, I>(root: &Path, globs: I) -> Result<BTreeSet<String>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut candidates: BTreeSet<PathBuf> = BTreeSet::new();
    for glob in globs {
        let mut matched = expand(root, glob)?;
        // The glob crate yields only the subdirectories for `X/**`, never X.
        if glob == "**" {
            matched.push(root.to_path_buf());
        } else if let Some(prefix) = glob.strip_suffix("/**") {
            matched.extend(expand(root, prefix)?);
        }
        debug!(pattern = %glob, matches = matched.len(), "expanded pattern");
        candidates.extend(matched);
    }

    let directories: Vec<PathBuf> = candidates.iter().filter(|p| p.is_dir()).cloned().collect();
    for dir in directories {
        let rel = relative_posix(root, &dir).unwrap_or_default();
        // `dir/**` alone only yields directories in the glob crate.
        let nested = if rel.is_empty() {
            "**/*".to_string()
        } else {
            format!("{}/**/*", GlobPattern::escape(&rel))
        };
        candidates.extend(expand(root, &nested)?);
    }

    let mut files = BTreeSet::new();
    for candidate in candidates {
        match fs::symlink_metadata(&candidate) {
            Ok(meta) if meta.file_type().is_file() => {
                if let Some(rel) = relative_posix(root, &candidate) {
                    files.insert(rel);
                }
            }
            Ok(_) => {}
            Err(e) => debug!(path = %candidate.display(), error = %e, "dropping vanished candidate"),
        }
    }
    Ok(files)
}

/// Run one glob relative to `root` and keep matches whose hidden components
/// were asked for explicitly.
fn expand(root: &Path, glob: &str) -> Result<Vec<PathBuf>> {
    let invalid = |reason: String| BlobmanError::InvalidPattern {
        pattern: glob.to_string(),
        reason,
    };

    let anchored = format!(
        "{}/{}",
        GlobPattern::escape(&root.to_string_lossy()).trim_end_matches('/'),
        glob
    );
    let paths = glob::glob_with(&anchored, MATCH_OPTIONS).map_err(|e| invalid(e.msg.to_string()))?;

    let dot_segments: Vec<GlobPattern> = glob
        .split('/')
        .filter(|seg| seg.starts_with('.') && *seg != "." && *seg != "..")
        .filter_map(|seg| GlobPattern::new(seg).ok())
        .collect();

    let mut out = Vec::new();
    for entry in paths {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                debug!(error = %e, "skipping unreadable path during glob");
                continue;
            }
        };
        let Some(rel) = relative_posix(root, &path) else {
            continue;
        };
        let hidden_ok = rel
            .split('/')
            .filter(|c| c.starts_with('.'))
            .all(|c| dot_segments.iter().any(|seg| seg.matches_with(c, MATCH_OPTIONS)));
        if hidden_ok {
            out.push(path);
        }
    }
    Ok(out)
}

/// `path` relative to `root`, joined with `/`.
///
/// `None` unless `path` lies strictly below `root`, which rules out the `.`
/// and `..` entries a leading-dot glob can match.
fn relative_posix(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(s) => parts.push(s.to_string_lossy().into_owned()),
            _ => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}
