// Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// Initialize tracing for the process.
///
/// `RUST_LOG` wins when set, otherwise `default_level` applies. Logs go to
/// stderr so command output on stdout stays clean.
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init(default_level: &str, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
