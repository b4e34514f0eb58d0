//! Logging initialization using `tracing` and `tracing-subscriber`.

use tracing_subscriber::{fmt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding an explicit filter directive.
pub const LOG_ENV: &str = "BLOBMAN_LOG";

/// Filter directive used when `BLOBMAN_LOG` is unset.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "blobman=debug"
    } else {
        "blobman=warn"
    }
}

/// Initialize the global subscriber, writing to stderr so stdout carries only
/// command output. Later calls are no-ops.
pub fn init_logging(verbose: bool, ansi: bool) {
    if tracing::dispatcher::has_been_set() {
        return;
    }

    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let _ = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(ansi)
        .with_writer(std::io::stderr)
        .finish()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(true), "blobman=debug");
        assert_eq!(default_directive(false), "blobman=warn");
    }

    #[test]
    fn test_init_is_idempotent() {
        init_logging(false, false);
        init_logging(true, false);
        assert!(tracing::dispatcher::has_been_set());
    }
}
