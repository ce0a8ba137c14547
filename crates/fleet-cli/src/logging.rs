//! Tracing setup

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global subscriber, writing compact logs to stderr.
///
/// `RUST_LOG` wins when set; otherwise `warn`, or `debug` for the fleet
/// crates with `--verbose`.
pub fn init(verbose: bool) {
    let default = if verbose {
        "warn,fleet_core=debug,fleet_git=debug,fleet_fs=debug,fleet=debug"
    } else {
        "warn"
    };
    let filter_layer = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_level(true)
        .compact();

    // A subscriber may already be installed in tests.
    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init();
}
