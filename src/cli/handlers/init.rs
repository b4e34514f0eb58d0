use std::fs;
use std::path::Path;

use tracing::warn;

use crate::cli::ui::{print_success, prompt_line, prompt_secret};
use crate::config::BlobmanConfig;
use crate::core::Workspace;
use crate::error::{BlobmanError, ErrorContext, Result};
use crate::system::{GitCli, ResticCli};

/// Environment variable consulted before prompting for the restic password.
pub const PASSWORD_ENV: &str = "RESTIC_PASSWORD";

/// Handle repository initialization
pub fn handle_init(workspace: &Workspace, repository: Option<&str>) -> Result<()> {
    if workspace.is_initialized() {
        return Err(BlobmanError::AlreadyExists {
            resource: "blobman repository".to_string(),
            identifier: workspace.blobman_dir().display().to_string(),
        });
    }

    let repository_url = match repository {
        Some(url) => url.to_string(),
        None => prompt_line("Restic Repository")
            .with_io_context(|| "reading repository URL".to_string())?,
    };
    if repository_url.trim().is_empty() {
        return Err(BlobmanError::Config {
            message: "restic repository URL must not be empty".to_string(),
            path: None,
        });
    }

    let password = match std::env::var(PASSWORD_ENV) {
        Ok(password) => password,
        Err(_) => prompt_secret("Restic Password")
            .with_io_context(|| "reading repository password".to_string())?,
    };

    let config = BlobmanConfig::new(repository_url);
    workspace.initialize(&config, &password)?;

    let restic = ResticCli::new(workspace.root(), workspace.credentials(&config)?);
    if let Err(err) = restic.init_repository() {
        // Leave no half-initialized layout behind so init can be retried.
        if let Err(cleanup) = fs::remove_dir_all(workspace.blobman_dir()) {
            warn!(error = %cleanup, "could not remove partially initialized .blobman");
        }
        return Err(err);
    }

    let config_path = workspace.config_path();
    let lock_path = workspace.lock_path();
    let staged: [&Path; 2] = [&config_path, &lock_path];
    GitCli::new(workspace.root()).stage(&staged)?;

    print_success(&format!(
        "Initialized blobman in {}",
        workspace.blobman_dir().display()
    ));
    Ok(())
}
