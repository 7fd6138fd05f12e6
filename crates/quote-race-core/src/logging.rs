use tracing_subscriber::EnvFilter;

/// Install a stderr logger filtered by `RUST_LOG` (default: `info`)
///
/// Calling this more than once keeps the first logger.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
