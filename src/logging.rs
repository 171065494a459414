//! Tracing subscriber setup.
//!
//! The library itself only emits `tracing` events; embedding applications
//! and tests call one of the initializers here to see them. Filtering comes
//! from `RUST_LOG` and defaults to [`DEFAULT_DIRECTIVE`].

use std::sync::Once;
#[allow(unused_imports)]
use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

static INIT: Once = Once::new();

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_DIRECTIVE: &str = "info";

/// Output format of the global subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event, including the current span
    /// (`build_descriptor` carries the path being extracted)
    Json,
}

/// Install the global subscriber in `format`.
///
/// Only the first call across the process has any effect.
pub fn init_tracing_with(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
        let registry = tracing_subscriber::registry().with(env_filter);

        match format {
            LogFormat::Pretty => registry
                .with(
                    fmt::layer()
                        .with_span_events(FmtSpan::CLOSE)
                        .with_target(true)
                        .with_thread_ids(true)
                        .with_file(true)
                        .with_line_number(true),
                )
                .init(),
            LogFormat::Json => registry
                .with(
                    fmt::layer()
                        .json()
                        .with_span_events(FmtSpan::CLOSE)
                        .with_target(true)
                        .with_thread_ids(true)
                        .with_current_span(true),
                )
                .init(),
        }

        debug!(?format, "Signer extraction tracing initialized");
    });
}

/// Initialize the global subscriber with human-readable output.
pub fn init_tracing() {
    init_tracing_with(LogFormat::Pretty);
}

/// Initialize the global subscriber with JSON output.
pub fn init_tracing_json() {
    init_tracing_with(LogFormat::Json);
}

/// Create an info-level span.
#[macro_export]
macro_rules! span_trace {
    ($name:expr) => {
        tracing::info_span!($name)
    };
    ($name:expr, $($field:tt)*) => {
        tracing::info_span!($name, $($field)*)
    };
}

/// Log an error at `error` level and evaluate to it, for use in `map_err`.
#[macro_export]
macro_rules! log_error {
    ($err:expr) => {{
        let e = $err;
        tracing::error!(error = %e, "Extraction failed");
        e
    }};
    ($err:expr, $msg:expr) => {{
        let e = $err;
        tracing::error!(error = %e, context = %$msg, "Extraction failed");
        e
    }};
}
