use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize structured logging with environment-based filtering.
///
/// Defaults to INFO with DEBUG for this crate; override with RUST_LOG,
/// e.g. `RUST_LOG=order_event_sourcing=trace`.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,order_event_sourcing=debug")),
        )
        .init();
}
