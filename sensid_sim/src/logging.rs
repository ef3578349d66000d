// sensid_sim/src/logging.rs

use tracing_subscriber::EnvFilter;

/// Filter used when neither `--log-filter` nor `RUST_LOG` is given.
pub const DEFAULT_FILTER: &str = "info,sensid_sim=debug,sensid_core=info";

/// Installs the global `tracing` subscriber.
///
/// An explicit filter wins over `RUST_LOG`, which wins over `DEFAULT_FILTER`.
/// Calling this twice is harmless; the second call is ignored.
pub fn init(filter: Option<&str>) {
    let filter = match filter {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
