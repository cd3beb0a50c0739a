use tracing_subscriber::EnvFilter;

/// Installs JSON log output for CloudWatch.
///
/// Level comes from `RUST_LOG` (default `info`). Timestamps are left to
/// CloudWatch, which stamps every line on ingestion.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_target(false)
        .with_current_span(false)
        .with_ansi(false)
        .without_time()
        .try_init();
}
