use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "blobman",
    version,
    about = "Track large binary files next to git and snapshot them with restic"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Run as if started in this directory
    #[arg(short = 'C', long = "repo", global = true)]
    pub repo: Option<std::path::PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize blobman config files & restic repository
    Init {
        /// Restic repository URL (prompted for when omitted)
        #[arg(long)]
        repository: Option<String>,
    },

    /// Track a glob pattern
    Add {
        pattern: String,
    },

    /// Remove a tracked pattern by its ID
    Remove {
        pattern_id: String,
    },

    /// Take a snapshot of local blobs
    Snapshot {
        #[arg(long, help = "Show what would be snapshotted")]
        dry: bool,
    },

    /// Restore blobs from a snapshot (defaults to the locked one)
    Checkout {
        tag: Option<String>,
        #[arg(long, help = "Show what the checkout would overwrite")]
        dry: bool,
    },

    /// List patterns, exact files & snapshot history
    Status {
        #[arg(long, help = "Show diff of local & locked blobs")]
        diff: bool,
    },
}
