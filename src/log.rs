//! Logging setup for the command line.

use tracing_subscriber::EnvFilter;

/// Install a stderr subscriber.
///
/// `RUST_LOG` wins when set; otherwise `verbose` picks `debug` over `info`.
/// Calling it twice is harmless.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "pagerace=debug" } else { "pagerace=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
