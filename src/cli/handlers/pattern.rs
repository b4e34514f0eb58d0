use tracing::info;

use crate::cli::ui::{print_info, print_success};
use crate::core::{check_disjoint, resolve, Workspace};
use crate::error::Result;
use crate::system::{GitCli, VersionControl};

/// Handle pattern registration
///
/// The pattern is only saved if its files stay clear of git.
pub fn handle_add(workspace: &Workspace, pattern: &str) -> Result<()> {
    let mut config = workspace.load_config()?;
    workspace.load_lock()?;

    let (id, inserted) = config.include_patterns.add(pattern)?;
    if !inserted {
        print_info(&format!("{} - {} (already tracked)", id, pattern));
        return Ok(());
    }

    let files = resolve(workspace.root(), config.include_patterns.globs())?;
    let tracked = GitCli::new(workspace.root()).tracked_paths()?;
    check_disjoint(&files, &tracked)?;

    workspace.save_config(&config)?;
    info!(%id, %pattern, files = files.len(), "pattern added");
    print_success(&format!("{} - {}", id, pattern));
    Ok(())
}

/// Handle pattern removal
pub fn handle_remove(workspace: &Workspace, pattern_id: &str) -> Result<()> {
    let mut config = workspace.load_config()?;
    let glob = config.include_patterns.remove(pattern_id)?;
    workspace.save_config(&config)?;
    info!(id = %pattern_id, pattern = %glob, "pattern removed");
    print_success(&format!("Removed {} - {}", pattern_id, glob));
    Ok(())
}
