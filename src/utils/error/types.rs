//! Error types for the resilience engine

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias for the engine
pub type Result<T> = std::result::Result<T, EngineError>;

/// Failure returned by a caller-supplied operation running against a provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The caller passed an invalid argument (caller bug, never retried)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation observed cancellation
    #[error("Operation cancelled")]
    Cancelled,

    /// The provider rejected the request as malformed or unauthorized
    #[error("Client error ({code}): {message}")]
    Client {
        /// Provider-specific error code
        code: String,
        /// Error message
        message: String,
    },

    /// The provider did not answer in time
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Transport-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// The provider reported itself unavailable
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// The provider throttled the request
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Anything else
    #[error("{0}")]
    Other(String),
}

/// Classification tag for [`ProviderError`], used by retry configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidArgument,
    Cancelled,
    Client,
    Timeout,
    Network,
    Unavailable,
    RateLimited,
    Other,
}

impl ErrorKind {
    /// Kinds that signal a caller-side problem and are never retried
    pub fn is_caller_fault(self) -> bool {
        matches!(self, ErrorKind::InvalidArgument | ErrorKind::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Client => "client",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Network => "network",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Other => "other",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ProviderError {
    /// Get the classification tag of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProviderError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            ProviderError::Cancelled => ErrorKind::Cancelled,
            ProviderError::Client { .. } => ErrorKind::Client,
            ProviderError::Timeout(_) => ErrorKind::Timeout,
            ProviderError::Network(_) => ErrorKind::Network,
            ProviderError::Unavailable(_) => ErrorKind::Unavailable,
            ProviderError::RateLimited(_) => ErrorKind::RateLimited,
            ProviderError::Other(_) => ErrorKind::Other,
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn client(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Client {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout(message.into())
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimited(message.into())
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// Error returned to callers of the engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// The last real provider failure, propagated unchanged
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Every candidate was unhealthy, filtered out or already tried
    #[error("No providers available for '{service_type}'")]
    NoProvidersAvailable {
        /// Service type the request was made for
        service_type: String,
        /// Last failure observed before exhaustion, if any attempt was made
        #[source]
        last_error: Option<ProviderError>,
    },

    /// The caller cancelled the request
    #[error("Request cancelled")]
    Cancelled,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl EngineError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn no_providers(service_type: impl Into<String>, last_error: Option<ProviderError>) -> Self {
        Self::NoProvidersAvailable {
            service_type: service_type.into(),
            last_error,
        }
    }

    /// Get the provider failure carried by this error, if any
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            EngineError::Provider(err) => Some(err),
            EngineError::NoProvidersAvailable { last_error, .. } => last_error.as_ref(),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, EngineError::Cancelled)
    }
}
