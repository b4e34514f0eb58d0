use crate::cli::handlers::open_service;
use crate::cli::ui::{print_diff, print_info, print_success};
use crate::core::Workspace;
use crate::error::Result;

/// Handle snapshot creation
pub fn handle_snapshot(workspace: &Workspace, dry: bool) -> Result<()> {
    let (_, mut service) = open_service(workspace)?;

    if dry {
        let plan = service.plan_snapshot()?;
        print_diff(&plan);
        if plan.is_clean() {
            print_info("Nothing to snapshot, worktree matches the lock");
        }
        return Ok(());
    }

    let commit = service.commit_snapshot()?;
    print_diff(&commit.diff);
    let tag = commit.lock.snapshot_tag().unwrap_or_default();
    print_success(&format!(
        "Created snapshot {} with {} file(s)",
        tag,
        commit.lock.len()
    ));
    Ok(())
}
