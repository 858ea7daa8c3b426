use tracing_subscriber::{fmt, EnvFilter};

/// Initializes tracing based on RUST_LOG, defaulting to info-level output
/// for this crate only.
pub fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("askdb=info"));

    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();
}
