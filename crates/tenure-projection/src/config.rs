//! Projection configuration.
//!
//! Every setting has a default; [`ProjectionConfig::from_env`] overrides them
//! from `TENURE_*` environment variables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use tenure_core::LogFormat;

use crate::effects::client::RetryPolicy;
use crate::error::{Error, Result};

/// Application source written on every recorded action.
pub const DEFAULT_APP_SOURCE: &str = "event-processing-platform-subscribers";

/// Configuration for the projection engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Application source stamped on actions.
    pub app_source: String,
    /// Log output format.
    pub log_format: LogFormat,
    /// Whether status transitions are recorded as timeline actions.
    pub record_actions: bool,
    /// Total attempts per sibling call.
    pub retry_max_attempts: u32,
    /// First retry delay in milliseconds.
    pub retry_base_backoff_ms: u64,
    /// Retry delay cap in milliseconds.
    pub retry_max_backoff_ms: u64,
    /// Optional bound on pending effects.
    pub outbox_capacity: Option<usize>,
    /// Sibling calls in flight while draining the outbox.
    pub dispatch_concurrency: usize,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            app_source: DEFAULT_APP_SOURCE.to_string(),
            log_format: LogFormat::default(),
            record_actions: true,
            retry_max_attempts: 3,
            retry_base_backoff_ms: 50,
            retry_max_backoff_ms: 500,
            outbox_capacity: None,
            dispatch_concurrency: crate::effects::dispatcher::DEFAULT_CONCURRENCY,
        }
    }
}

impl ProjectionConfig {
    /// Loads configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `TENURE_APP_SOURCE` | `event-processing-platform-subscribers` |
    /// | `TENURE_LOG_FORMAT` | `pretty` |
    /// | `TENURE_RECORD_ACTIONS` | `true` |
    /// | `TENURE_RETRY_MAX_ATTEMPTS` | `3` |
    /// | `TENURE_RETRY_BASE_BACKOFF_MS` | `50` |
    /// | `TENURE_RETRY_MAX_BACKOFF_MS` | `500` |
    /// | `TENURE_OUTBOX_CAPACITY` | unbounded |
    /// | `TENURE_DISPATCH_CONCURRENCY` | `8` |
    ///
    /// # Errors
    ///
    /// Returns an error if any variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = Env(lookup);
        let mut config = Self::default();

        if let Some(source) = env.string("TENURE_APP_SOURCE") {
            config.app_source = source;
        }
        if let Some(format) = env.string("TENURE_LOG_FORMAT") {
            config.log_format = format
                .parse()
                .map_err(|e| Error::configuration(format!("TENURE_LOG_FORMAT: {e}")))?;
        }
        if let Some(record) = env.bool("TENURE_RECORD_ACTIONS")? {
            config.record_actions = record;
        }
        if let Some(attempts) = env.u32("TENURE_RETRY_MAX_ATTEMPTS")? {
            config.retry_max_attempts = attempts;
        }
        if let Some(ms) = env.u64("TENURE_RETRY_BASE_BACKOFF_MS")? {
            config.retry_base_backoff_ms = ms;
        }
        if let Some(ms) = env.u64("TENURE_RETRY_MAX_BACKOFF_MS")? {
            config.retry_max_backoff_ms = ms;
        }
        config.outbox_capacity = env.usize("TENURE_OUTBOX_CAPACITY")?;
        if let Some(concurrency) = env.usize("TENURE_DISPATCH_CONCURRENCY")? {
            config.dispatch_concurrency = concurrency;
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        if self.app_source.trim().is_empty() {
            return Err(Error::configuration("app_source must not be empty"));
        }
        if self.retry_max_attempts == 0 {
            return Err(Error::configuration("retry_max_attempts must be at least 1"));
        }
        if self.retry_base_backoff_ms > self.retry_max_backoff_ms {
            return Err(Error::configuration(
                "retry_base_backoff_ms must not exceed retry_max_backoff_ms",
            ));
        }
        if self.dispatch_concurrency == 0 {
            return Err(Error::configuration("dispatch_concurrency must be at least 1"));
        }
        Ok(())
    }

    /// Retry policy for sibling calls.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_max_attempts,
            base_backoff: Duration::from_millis(self.retry_base_backoff_ms),
            max_backoff: Duration::from_millis(self.retry_max_backoff_ms),
        }
    }
}

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn string(&self, name: &str) -> Option<String> {
        (self.0)(name).and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    fn u32(&self, name: &str) -> Result<Option<u32>> {
        let Some(v) = self.string(name) else {
            return Ok(None);
        };
        v.parse::<u32>()
            .map(Some)
            .map_err(|e| Error::configuration(format!("{name} must be a u32: {e}")))
    }

    fn u64(&self, name: &str) -> Result<Option<u64>> {
        let Some(v) = self.string(name) else {
            return Ok(None);
        };
        v.parse::<u64>()
            .map(Some)
            .map_err(|e| Error::configuration(format!("{name} must be a u64: {e}")))
    }

    fn usize(&self, name: &str) -> Result<Option<usize>> {
        let Some(v) = self.string(name) else {
            return Ok(None);
        };
        v.parse::<usize>()
            .map(Some)
            .map_err(|e| Error::configuration(format!("{name} must be a usize: {e}")))
    }

    fn bool(&self, name: &str) -> Result<Option<bool>> {
        let Some(v) = self.string(name) else {
            return Ok(None);
        };
        parse_bool(name, &v).map(Some)
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" => Ok(false),
        _ => Err(Error::configuration(format!(
            "{name} must be a boolean (true/false/1/0)"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ProjectionConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ProjectionConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_without_variables() -> Result<()> {
        let config = load(&[])?;
        assert_eq!(config, ProjectionConfig::default());
        assert_eq!(config.app_source, DEFAULT_APP_SOURCE);
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        Ok(())
    }

    #[test]
    fn variables_override_defaults() -> Result<()> {
        let config = load(&[
            ("TENURE_APP_SOURCE", "  replayer "),
            ("TENURE_LOG_FORMAT", "json"),
            ("TENURE_RECORD_ACTIONS", "no"),
            ("TENURE_RETRY_MAX_ATTEMPTS", "5"),
            ("TENURE_RETRY_BASE_BACKOFF_MS", "10"),
            ("TENURE_OUTBOX_CAPACITY", "1000"),
            ("TENURE_DISPATCH_CONCURRENCY", "2"),
        ])?;
        assert_eq!(config.app_source, "replayer");
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(!config.record_actions);
        assert_eq!(config.retry_policy().max_attempts, 5);
        assert_eq!(config.retry_policy().base_backoff, Duration::from_millis(10));
        assert_eq!(config.outbox_capacity, Some(1000));
        assert_eq!(config.dispatch_concurrency, 2);
        Ok(())
    }

    #[test]
    fn blank_values_are_ignored() -> Result<()> {
        let config = load(&[("TENURE_APP_SOURCE", "   "), ("TENURE_OUTBOX_CAPACITY", "")])?;
        assert_eq!(config.app_source, DEFAULT_APP_SOURCE);
        assert_eq!(config.outbox_capacity, None);
        Ok(())
    }

    #[test]
    fn unparsable_values_are_configuration_errors() {
        for (name, value) in [
            ("TENURE_RETRY_MAX_ATTEMPTS", "three"),
            ("TENURE_RECORD_ACTIONS", "maybe"),
            ("TENURE_LOG_FORMAT", "xml"),
        ] {
            let err = load(&[(name, value)]).unwrap_err();
            assert!(matches!(err, Error::Configuration { .. }), "{name}: {err}");
        }
    }

    #[test]
    fn validation_rejects_inverted_backoff() {
        let err = load(&[
            ("TENURE_RETRY_BASE_BACKOFF_MS", "900"),
            ("TENURE_RETRY_MAX_BACKOFF_MS", "100"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("retry_base_backoff_ms"));
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert!(parse_bool("T", "TRUE").unwrap());
        assert!(parse_bool("T", "1").unwrap());
        assert!(!parse_bool("T", "n").unwrap());
        assert!(parse_bool("T", "").is_err());
    }
}
