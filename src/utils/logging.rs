//! Structured logging configuration
//!
//! Initializes the tracing subscriber from [`LoggingConfig`]. The `RUST_LOG`
//! environment variable takes precedence over the configured level so a
//! deployment can turn on targeted debug output without editing config.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Initialize the global tracing subscriber.
///
/// Safe to call more than once; later calls are no-ops (important for
/// tests, where many cases may try to initialize logging).
pub fn init_logging(config: &LoggingConfig) {
    if !config.log_to_console {
        return;
    }

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    if config.json_format {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.try_init();
    }
}
