//! Error handling for domain verification.
//!
//! This module defines a single error type covering every way a verification run
//! can fail. Only configuration errors are fatal to a run; every other variant is
//! caught by the coordinator and folded into the affected domain's record.

use std::time::Duration;
use thiserror::Error;

/// Main error type for domain verification operations.
#[derive(Debug, Clone, Error)]
pub enum DomainAuditError {
    /// Invalid domain name format
    #[error("Invalid domain '{domain}': {reason}")]
    InvalidDomain { domain: String, reason: String },

    /// DNS lookup did not produce an address (timeout, NXDOMAIN, network error)
    #[error("Resolution failed for '{domain}': {message}")]
    ResolutionFailure { domain: String, message: String },

    /// Live-validation write/read round trip failed
    #[error("Live validation failed for '{domain}': {message}")]
    ValidationFailure { domain: String, message: String },

    /// HTTP status probe failed (diagnostic only)
    #[error("Status probe failed for '{domain}': {message}")]
    ProbeFailure { domain: String, message: String },

    /// Configuration errors (no server IP, no domains, invalid settings)
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Control panel domain discovery failures
    #[error("Domain discovery via {panel} failed: {message}")]
    Discovery { panel: String, message: String },

    /// File I/O errors when reading domain lists or writing reports
    #[error("File error at '{path}': {message}")]
    FileError { path: String, message: String },

    /// Timeout errors when a stage takes too long
    #[error("Timeout after {duration:?} during: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// Network-related errors (connection, TLS, etc.)
    #[error("Network error: {}{}", .message, .detail.as_ref().map(|d| format!(" (source: {})", d)).unwrap_or_default())]
    NetworkError {
        message: String,
        detail: Option<String>,
    },

    /// Generic internal errors that don't fit other categories
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainAuditError {
    /// Create a new invalid domain error.
    pub fn invalid_domain<D: Into<String>, R: Into<String>>(domain: D, reason: R) -> Self {
        Self::InvalidDomain {
            domain: domain.into(),
            reason: reason.into(),
        }
    }

    /// Create a new resolution failure.
    pub fn resolution<D: Into<String>, M: Into<String>>(domain: D, message: M) -> Self {
        Self::ResolutionFailure {
            domain: domain.into(),
            message: message.into(),
        }
    }

    /// Create a new live-validation failure.
    pub fn validation<D: Into<String>, M: Into<String>>(domain: D, message: M) -> Self {
        Self::ValidationFailure {
            domain: domain.into(),
            message: message.into(),
        }
    }

    /// Create a new probe failure.
    pub fn probe<D: Into<String>, M: Into<String>>(domain: D, message: M) -> Self {
        Self::ProbeFailure {
            domain: domain.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new discovery error.
    pub fn discovery<P: Into<String>, M: Into<String>>(panel: P, message: M) -> Self {
        Self::Discovery {
            panel: panel.into(),
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout<O: Into<String>>(operation: O, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a new network error with source information.
    pub fn network_with_source<M: Into<String>, S: Into<String>>(message: M, source: S) -> Self {
        Self::NetworkError {
            message: message.into(),
            detail: Some(source.into()),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error must abort the whole run.
    ///
    /// Only configuration problems are fatal; everything else is recorded
    /// against the domain it happened to.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ConfigError { .. })
    }

    /// Whether this error came from a stage running out of time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<reqwest::Error> for DomainAuditError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout("HTTP request", Duration::from_secs(0))
        } else if err.is_connect() {
            Self::network_with_source("Connection failed", err.to_string())
        } else {
            Self::network_with_source("HTTP request failed", err.to_string())
        }
    }
}

impl From<serde_json::Error> for DomainAuditError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal {
            message: format!("JSON parsing failed: {}", err),
        }
    }
}

impl From<std::io::Error> for DomainAuditError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}
