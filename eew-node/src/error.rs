//! Error types for eew-node.

use std::time::Duration;

use eew_types::{ProviderTag, TypesError};

/// Main error type for eew-node operations.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Provider fetch error.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Battery sampling error.
    #[error("battery sampler error: {0}")]
    Sampler(#[from] SamplerError),

    /// Wire format or validation error.
    #[error("wire error: {0}")]
    Wire(#[from] TypesError),
}

/// Errors from an upstream provider adapter.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    /// Network-level failure reaching the provider.
    #[error("{provider}: network error: {reason}")]
    Network {
        /// Provider that failed.
        provider: ProviderTag,
        /// Failure description.
        reason: String,
    },

    /// Fetch did not complete in time.
    #[error("{provider}: timed out after {elapsed:?}")]
    Timeout {
        /// Provider that timed out.
        provider: ProviderTag,
        /// Time allowed for the attempt.
        elapsed: Duration,
    },

    /// Provider answered with something unparseable.
    #[error("{provider}: parse error: {reason}")]
    Parse {
        /// Provider that sent the response.
        provider: ProviderTag,
        /// Failure description.
        reason: String,
    },

    /// Provider reported itself unavailable (maintenance, rate limit).
    #[error("{provider}: unavailable")]
    Unavailable {
        /// Provider that is unavailable.
        provider: ProviderTag,
    },
}

impl ProviderError {
    /// Provider the error came from.
    pub fn provider(&self) -> ProviderTag {
        match self {
            ProviderError::Network { provider, .. }
            | ProviderError::Timeout { provider, .. }
            | ProviderError::Parse { provider, .. }
            | ProviderError::Unavailable { provider } => *provider,
        }
    }
}

/// Battery sampler errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SamplerError {
    /// The platform could not report a level.
    #[error("battery level unavailable: {0}")]
    Unavailable(String),

    /// The sampler returned a value that is not a number.
    #[error("battery level is not a number")]
    NotANumber,
}

/// Result type alias for node operations.
pub type Result<T> = std::result::Result<T, NodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_names_provider() {
        let err = ProviderError::Timeout {
            provider: ProviderTag::Afad,
            elapsed: Duration::from_millis(1500),
        };
        assert_eq!(err.provider(), ProviderTag::Afad);
        assert_eq!(err.to_string(), "afad: timed out after 1.5s");
    }

    #[test]
    fn node_error_wraps_provider_error() {
        let err: NodeError = ProviderError::Unavailable {
            provider: ProviderTag::Usgs,
        }
        .into();
        assert!(err.to_string().contains("usgs: unavailable"));
    }
}
