pub mod settings;

pub use settings::{atomic_write, BlobmanConfig, RepositoryCredentials};
