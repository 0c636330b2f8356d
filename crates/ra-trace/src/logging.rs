use tracing_subscriber::{fmt, EnvFilter};

/// Output format for process-wide logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable single-line output.
    #[default]
    Text,
    /// JSON lines, suitable for log shippers.
    Json,
}

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence when set; otherwise `default_level` is used
/// (e.g. `"info"` or `"ra_agent=debug,info"`).
///
/// Safe to call more than once — later calls are no-ops, so tests can
/// initialize freely.
pub fn init(service_name: &str, default_level: &str, format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let initialized = match format {
        LogFormat::Text => fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .try_init()
            .is_ok(),
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .try_init()
            .is_ok(),
    };

    if initialized {
        tracing::info!(service = service_name, format = ?format, "logging initialised");
    }
}
