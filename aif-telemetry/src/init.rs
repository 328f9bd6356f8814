//! Telemetry initialization and configuration

use std::sync::Once;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Output format for the process-wide subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines for local development.
    #[default]
    Pretty,
    /// One JSON object per line, for log collectors.
    Json,
}

/// Initialize console logging in the human-readable format.
///
/// Safe to call more than once; only the first call installs a subscriber.
///
/// # Example
/// ```
/// use aif_telemetry::init_telemetry;
/// init_telemetry("aif-evaluator").expect("Failed to initialize telemetry");
/// ```
pub fn init_telemetry(service_name: &str) -> Result<(), Box<dyn std::error::Error>> {
    init_with_format(service_name, LogFormat::Pretty)
}

/// Initialize console logging with JSON lines output.
pub fn init_json_telemetry(service_name: &str) -> Result<(), Box<dyn std::error::Error>> {
    init_with_format(service_name, LogFormat::Json)
}

/// Initialize console logging with an explicit format.
///
/// The filter comes from `RUST_LOG` and defaults to `info`.
pub fn init_with_format(
    service_name: &str,
    format: LogFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    let mut filter = Some(filter);

    INIT.call_once(|| {
        let Some(filter) = filter.take() else {
            return;
        };
        let registry = tracing_subscriber::registry().with(filter);

        let installed = match format {
            LogFormat::Pretty => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_target(true)
                        .with_thread_ids(true)
                        .with_line_number(true),
                )
                .try_init(),
            LogFormat::Json => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_current_span(true)
                        .with_span_list(false)
                        .with_target(true),
                )
                .try_init(),
        };

        // Another subscriber may already be set by the embedding application.
        if installed.is_ok() {
            tracing::info!(service.name = service_name, ?format, "Telemetry initialized");
        }
    });

    Ok(())
}
