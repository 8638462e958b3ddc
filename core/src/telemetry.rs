// Tracing subscriber setup for binaries, examples and tests
use tracing_subscriber::EnvFilter;

/// Initialize logging with `RUST_LOG` or an "info" default.
pub fn init() {
    init_with_filter("info");
}

/// Initialize logging with `RUST_LOG` or the given default directive.
/// Safe to call more than once; later calls are no-ops.
pub fn init_with_filter(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
