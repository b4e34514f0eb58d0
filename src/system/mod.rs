pub mod command;
pub mod git;
pub mod restic;

pub use git::{GitCli, VersionControl};
pub use restic::{BackupService, ResticCli, TAG_PREFIX};
