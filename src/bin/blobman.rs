use std::path::PathBuf;
use std::process;

use blobman::cli::handlers;
use blobman::cli::{print_error, Cli, Commands};
use blobman::error::{ErrorContext, Result};
use blobman::logging::init_logging;
use blobman::Workspace;
use clap::Parser;
use tracing::debug;

fn main() {
    let cli = Cli::parse();

    if cli.no_color {
        std::env::set_var("NO_COLOR", "1");
    }
    init_logging(cli.verbose, !cli.no_color);

    if let Err(error) = run_app(cli) {
        print_error(&error);
        process::exit(1);
    }
}

fn run_app(cli: Cli) -> Result<()> {
    let start = start_dir(cli.repo)?;
    let workspace = Workspace::discover(&start)?;
    debug!(root = %workspace.root().display(), "using repository");

    match cli.command {
        Commands::Init { repository } => handlers::handle_init(&workspace, repository.as_deref()),
        Commands::Add { pattern } => handlers::handle_add(&workspace, &pattern),
        Commands::Remove { pattern_id } => handlers::handle_remove(&workspace, &pattern_id),
        Commands::Snapshot { dry } => handlers::handle_snapshot(&workspace, dry),
        Commands::Checkout { tag, dry } => {
            handlers::handle_checkout(&workspace, tag.as_deref(), dry)
        }
        Commands::Status { diff } => handlers::handle_status(&workspace, diff),
    }
}

fn start_dir(repo: Option<PathBuf>) -> Result<PathBuf> {
    match repo {
        Some(path) => Ok(path),
        None => std::env::current_dir()
            .with_io_context(|| "reading current directory".to_string()),
    }
}
