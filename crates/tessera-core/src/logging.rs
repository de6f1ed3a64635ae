//! Logging bootstrap based on `tracing-subscriber`.

/// Filter used by [`init`]. GPU stack crates are noisy below `info`.
pub const DEFAULT_FILTER: &str = "trace,wgpu_core=info,wgpu_hal=info,naga=info";

/// Install the global fmt subscriber with [`DEFAULT_FILTER`].
///
/// The `RUST_LOG` environment variable is ignored; use [`init_with_filter`]
/// to pick different directives.
pub fn init() {
    init_with_filter(DEFAULT_FILTER);
}

/// Install the global fmt subscriber with the given env-filter directives.
///
/// Calling this twice is harmless: the second install fails silently.
pub fn init_with_filter(filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .try_init();
}
