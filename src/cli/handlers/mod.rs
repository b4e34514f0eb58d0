pub mod checkout;
pub mod init;
pub mod pattern;
pub mod snapshot;
pub mod status;

pub use checkout::*;
pub use init::*;
pub use pattern::*;
pub use snapshot::*;
pub use status::*;

use crate::config::BlobmanConfig;
use crate::core::{ReconciliationService, Workspace};
use crate::error::Result;
use crate::system::{GitCli, ResticCli};

/// The reconciliation service wired to the real git and restic clients.
pub type CliService = ReconciliationService<GitCli, ResticCli>;

/// Load config, lock and credentials, failing with `ConfigMissing` when the
/// repository was never initialized.
pub fn open_service(workspace: &Workspace) -> Result<(BlobmanConfig, CliService)> {
    let config = workspace.load_config()?;
    let credentials = workspace.credentials(&config)?;
    let root = workspace.root();
    let service = ReconciliationService::open(
        workspace.clone(),
        &config,
        GitCli::new(root),
        ResticCli::new(root, credentials),
    )?;
    Ok((config, service))
}
