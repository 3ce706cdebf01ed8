//! Logging setup.
//!
//! Library code only emits `tracing` events; the binary installs the
//! subscriber. `RUST_LOG` wins over the verbosity flag when set.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directive for a `-v` count.
pub fn filter_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "qualitymap=warn",
        1 => "qualitymap=info",
        2 => "qualitymap=debug",
        _ => "qualitymap=trace",
    }
}

/// Install the global subscriber writing to stderr.
///
/// Calling it twice is harmless; the second call is ignored.
pub fn init_logging(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(verbosity)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}
