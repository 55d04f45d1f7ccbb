//! Logging integration for the relq workspace.
//!
//! Provides a helper for configuring `tracing`-based logging. The engine
//! itself only emits events; subscriber choice belongs to the embedding
//! application, which can ignore this module entirely.

/// Sets up the global tracing subscriber.
///
/// `filter` uses the `RUST_LOG` syntax (e.g. `"relq_db=debug"`). When
/// `pretty` is true a human-readable format is used; otherwise a structured
/// JSON format suitable for log aggregation.
///
/// Installing a subscriber twice is a no-op, so tests can call this freely.
pub fn setup_logging(filter: &str, pretty: bool) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));

    if pretty {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .pretty()
            .try_init()
            .ok();
    } else {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .try_init()
            .ok();
    }
}
