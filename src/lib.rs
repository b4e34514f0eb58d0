// Core modules
pub mod error;
pub mod config;
pub mod core;
pub mod logging;

// External collaborators and the command-line surface
pub mod system;
pub mod cli;

// Re-exports for convenience
pub use error::{BlobmanError, Result};
pub use config::BlobmanConfig;
pub use core::{LockDiff, LockState, ReconciliationService, Workspace};
