use tracing_subscriber::EnvFilter;

/// Install a subscriber printing to stderr, filtered by `RUST_LOG` (`info` when unset). Does
/// nothing if a subscriber is already installed.
///
/// Stdout is left alone, as [`StdioTransport`](crate::StdioTransport) writes messages to it.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
