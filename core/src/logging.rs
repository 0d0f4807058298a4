//! Structured logging initialisers (§7: "structured log lines" as one of
//! the user-visible surfaces). Grounded in the teacher's `tracing`/
//! `tracing-subscriber` setup - human-readable for local runs, JSON for
//! aggregators, both driven by `RUST_LOG`.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Human-readable logging for local runs and terminals.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer())
        .init()
}

/// JSON logging for aggregators / observability pipelines.
pub fn init_json_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
        .init()
}
