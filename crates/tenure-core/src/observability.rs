//! Logging setup and the spans shared by the projection and the outbox.
//!
//! Each projected event runs in a `projection` span and each delivered side
//! effect in an `effect` span. Both carry the tenant, so one tenant's traffic
//! can be filtered out of interleaved logs.

use std::str::FromStr;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::Span;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::error::Error;

static INSTALLED: OnceLock<LogFormat> = OnceLock::new();

/// Filter applied when `RUST_LOG` is unset or unparsable.
const DEFAULT_FILTER: &str = "info";

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Multi-line human readable output.
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            _ => Err(Error::InvalidInput(format!(
                "unknown log format {normalized:?}, expected json or pretty"
            ))),
        }
    }
}

/// Installs the global tracing subscriber.
///
/// Only the first call has an effect; it returns the format that ended up
/// installed so a later caller can tell its own request was ignored. Levels
/// come from `RUST_LOG` (for example `tenure_projection=debug`) and default
/// to `info`.
///
/// ```rust
/// use tenure_core::observability::{LogFormat, init_logging};
///
/// let installed = init_logging(LogFormat::Json);
/// assert_eq!(init_logging(LogFormat::Pretty), installed);
/// ```
pub fn init_logging(format: LogFormat) -> LogFormat {
    *INSTALLED.get_or_init(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let output: Box<dyn Layer<Registry> + Send + Sync> = match format {
            LogFormat::Json => fmt::layer().json().with_current_span(true).boxed(),
            LogFormat::Pretty => fmt::layer().pretty().boxed(),
        };
        // A subscriber installed elsewhere (a test harness, say) wins.
        let _ = tracing_subscriber::registry()
            .with(output)
            .with(filter)
            .try_init();
        format
    })
}

/// Span around the projection of one inbound event.
#[must_use]
pub fn projection_span(event_type: &str, tenant: &str, aggregate_id: &str) -> Span {
    tracing::info_span!("projection", %tenant, event_type, aggregate_id)
}

/// Span around the delivery of one side effect, keyed by its idempotency key.
#[must_use]
pub fn effect_span(effect: &str, tenant: &str, idempotency_key: &str) -> Span {
    tracing::info_span!("effect", %tenant, effect, idempotency_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_keeps_the_first_format() {
        let first = init_logging(LogFormat::Pretty);
        assert_eq!(init_logging(LogFormat::Json), first);
    }

    #[test]
    fn log_format_ignores_case_and_padding() {
        assert_eq!("JSON".parse::<LogFormat>().ok(), Some(LogFormat::Json));
        assert_eq!(" pretty ".parse::<LogFormat>().ok(), Some(LogFormat::Pretty));
        let err = "xml".parse::<LogFormat>().unwrap_err();
        assert!(err.to_string().contains("\"xml\""));
    }

    #[test]
    fn effect_span_nests_inside_projection_span() {
        let outer = projection_span("V1_CONTRACT_CREATE", "acme", "01J");
        outer.in_scope(|| {
            let inner = effect_span("refresh_arr", "acme", "refresh_arr:01J:evt");
            inner.in_scope(|| tracing::debug!("nested"));
        });
    }
}
