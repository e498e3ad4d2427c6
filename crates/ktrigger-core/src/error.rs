//! Error types and result aliases for ktrigger.
//!
//! This module defines the shared error types used across all ktrigger components.
//! Errors are structured for programmatic handling and include context for debugging.

/// The result type used throughout ktrigger.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in ktrigger operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An unknown source kind was named.
    #[error("invalid source kind: {kind}")]
    InvalidKind {
        /// The kind string that failed to parse.
        kind: String,
    },

    /// A list was requested against an index that was never registered.
    #[error("index not registered: {field}")]
    IndexNotRegistered {
        /// The index field name that was queried.
        field: String,
    },

    /// A cache or storage operation failed.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration was missing or malformed.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },
}

impl Error {
    /// Creates a new storage error with the given message.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new storage error with a source cause.
    #[must_use]
    pub fn storage_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn invalid_kind_display() {
        let err = Error::InvalidKind {
            kind: "HelmRepository".into(),
        };
        assert_eq!(err.to_string(), "invalid source kind: HelmRepository");
    }

    #[test]
    fn storage_error_with_source() {
        let source = std::io::Error::new(std::io::ErrorKind::Other, "cache unavailable");
        let err = Error::storage_with_source("failed to list consumers", source);
        assert!(err.to_string().contains("storage error"));
        assert!(StdError::source(&err).is_some());
    }

    #[test]
    fn storage_error_without_source() {
        let err = Error::storage("lock poisoned");
        assert!(StdError::source(&err).is_none());
    }

    #[test]
    fn configuration_error_display() {
        let err = Error::configuration("KTRIGGER_LOG_FORMAT must be json or pretty");
        assert!(err.to_string().starts_with("configuration error"));
    }
}
