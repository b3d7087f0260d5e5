//! Logger adapter (component B): installs a `tracing_subscriber`
//! subscriber once per process, so embedding applications (and tests)
//! that already installed their own subscriber are left alone.

use std::sync::Once;

static INIT: Once = Once::new();

/// Whether installed logs are newline-delimited JSON (production) or
/// human-readable (development).
#[derive(Debug, Clone, Copy, Default)]
pub struct LogConfig {
    pub json: bool,
}

/// Installs the global `tracing` subscriber. Safe to call more than
/// once — only the first call takes effect.
pub fn init(config: LogConfig) {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

        let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
        if config.json {
            let _ = subscriber.json().try_init();
        } else {
            let _ = subscriber.try_init();
        }
    });
}
