//! Observability infrastructure for ktrigger.
//!
//! Structured logging with consistent spans. This module provides
//! initialization helpers and span constructors shared by all components.

use std::sync::Once;
use tracing::Span;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON structured logs (for production).
    Json,
    /// Pretty-printed logs (for development).
    #[default]
    Pretty,
}

/// Initializes the logging subsystem.
///
/// Call once at application startup. Safe to call multiple times;
/// subsequent calls are no-ops.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Controls log levels (e.g., `info`, `ktrigger_controller=debug`)
///
/// # Example
///
/// ```rust
/// use ktrigger_core::observability::{init_logging, LogFormat};
///
/// init_logging(LogFormat::Pretty);
/// ```
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        match format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().json())
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().pretty())
                    .init();
            }
        }
    });
}

/// Creates a span for handling one source change event.
///
/// # Example
///
/// ```rust
/// use ktrigger_core::observability::trigger_span;
///
/// let span = trigger_span("GitRepository", "flux-system/podinfo", "main/1a2b3c");
/// let _guard = span.enter();
/// ```
#[must_use]
pub fn trigger_span(kind: &str, source: &str, revision: &str) -> Span {
    tracing::info_span!("source_change", kind = kind, source = source, revision = revision)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logging_is_idempotent() {
        init_logging(LogFormat::Pretty);
        init_logging(LogFormat::Json);
    }

    #[test]
    fn trigger_span_can_be_entered() {
        let span = trigger_span("Bucket", "ns/configs", "e3b0c442");
        let _guard = span.enter();
        tracing::info!("inside trigger span");
    }
}
