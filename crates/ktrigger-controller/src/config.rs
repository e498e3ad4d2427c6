//! Runtime configuration for the triggering controller.
//!
//! Values are read from the process environment with strict validation so a
//! typo fails startup instead of silently falling back.

use ktrigger_core::{Error, LogFormat, Result};

const ENV_LOG_FORMAT: &str = "KTRIGGER_LOG_FORMAT";
const ENV_WATCH_NAMESPACE: &str = "KTRIGGER_WATCH_NAMESPACE";
const ENV_QUEUE_CAPACITY: &str = "KTRIGGER_QUEUE_CAPACITY";

/// Controller configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TriggerConfig {
    /// Log output format.
    pub log_format: LogFormat,
    /// Only react to objects in this namespace; `None` watches all namespaces.
    pub watch_namespace: Option<String>,
    /// Upper bound on pending reconcile requests; `None` is unbounded.
    pub queue_capacity: Option<usize>,
}

impl TriggerConfig {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a value is malformed.
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Loads configuration with a custom environment source.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a value is malformed.
    pub fn from_env_with<F>(get_env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let log_format = match get_env(ENV_LOG_FORMAT).as_deref().map(str::trim) {
            None | Some("") => LogFormat::default(),
            Some(raw) => parse_log_format(raw)?,
        };

        let watch_namespace = get_env(ENV_WATCH_NAMESPACE)
            .map(|ns| ns.trim().to_string())
            .filter(|ns| !ns.is_empty());

        let queue_capacity = get_env(ENV_QUEUE_CAPACITY)
            .map(|raw| parse_positive_usize(ENV_QUEUE_CAPACITY, &raw))
            .transpose()?;

        Ok(Self {
            log_format,
            watch_namespace,
            queue_capacity,
        })
    }

    /// Returns true if objects in `namespace` are within the watch scope.
    #[must_use]
    pub fn watches(&self, namespace: &str) -> bool {
        self.watch_namespace
            .as_deref()
            .map_or(true, |scope| scope == namespace)
    }
}

fn parse_log_format(raw: &str) -> Result<LogFormat> {
    match raw.to_ascii_lowercase().as_str() {
        "json" => Ok(LogFormat::Json),
        "pretty" => Ok(LogFormat::Pretty),
        _ => Err(Error::configuration(format!(
            "{ENV_LOG_FORMAT} must be 'json' or 'pretty', got '{raw}'"
        ))),
    }
}

fn parse_positive_usize(key: &str, raw: &str) -> Result<usize> {
    let parsed = raw.trim().parse::<usize>().map_err(|_| {
        Error::configuration(format!("{key} must be a positive integer, got '{raw}'"))
    })?;
    if parsed == 0 {
        return Err(Error::configuration(format!("{key} must be greater than zero")));
    }
    Ok(parsed)
}
