use tracing::warn;

use crate::cli::handlers::open_service;
use crate::cli::ui::{print_diff, print_files, print_history, print_info, print_patterns, print_warning};
use crate::core::{diff, Workspace};
use crate::error::Result;

/// Handle status reporting
///
/// A failing snapshot listing only costs the history section.
pub fn handle_status(workspace: &Workspace, show_diff: bool) -> Result<()> {
    let (_, service) = open_service(workspace)?;

    print_patterns(service.patterns());
    let worktree = service.worktree_state()?;
    print_files("Tracked blobs:", &worktree.path_set());

    let current = service.persisted().snapshot_tag();
    match service.history() {
        Ok(history) => print_history(&history, current),
        Err(err) => {
            warn!(error = %err, "could not list snapshots");
            print_warning(&format!("Could not list snapshots: {}", err));
        }
    }

    let state = service.status_of(&worktree, None)?;
    match current {
        Some(tag) => print_info(&format!("\nLocked to {}, worktree is {}", tag, state)),
        None => print_info(&format!("\nNo snapshot yet, worktree is {}", state)),
    }

    if show_diff {
        print_diff(&diff(service.persisted(), &worktree));
    }
    Ok(())
}
