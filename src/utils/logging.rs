// src/utils/logging.rs
use tracing_subscriber::{fmt, EnvFilter};

/// Sets up the logging framework using tracing_subscriber.
/// Reads log level filters from the `RUST_LOG` environment variable.
/// Without `RUST_LOG` the default is "info", raised to "debug" for this crate
/// when debug mode is requested on the command line.
pub fn setup_logging(debug: bool) {
    let default_directive = if debug {
        "info,merchant_extractor=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    fmt()
        .with_env_filter(filter)
        .with_target(debug)
        .init();

    let debug_mode = debug;
    tracing::debug!("Logging setup complete (debug mode: {}).", debug_mode);
}
