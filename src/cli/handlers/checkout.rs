use crate::cli::handlers::open_service;
use crate::cli::ui::{print_diff, print_info, print_success};
use crate::core::Workspace;
use crate::error::Result;

/// Handle snapshot checkout
pub fn handle_checkout(workspace: &Workspace, tag: Option<&str>, dry: bool) -> Result<()> {
    let (_, mut service) = open_service(workspace)?;

    if dry {
        let plan = service.plan_checkout(tag)?;
        print_info(&format!("Checkout of {} would change:", plan.record.tag));
        print_diff(&plan.diff);
        return Ok(());
    }

    let lock = service.commit_checkout(tag)?;
    print_success(&format!(
        "Checked out {} ({} file(s))",
        lock.snapshot_tag().unwrap_or_default(),
        lock.len()
    ));
    Ok(())
}
