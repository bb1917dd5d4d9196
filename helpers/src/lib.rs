use tracing_subscriber::EnvFilter;

/// Initialize logging for a demo.
///
/// Honors `RUST_LOG`, and otherwise shows every event emitted by the bucket
/// (which requires the `tracing` feature of `token-bucket`).
pub fn init_logging() {
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("token_bucket=trace"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_level(true)
                .compact(),
        )
        .init();
}
