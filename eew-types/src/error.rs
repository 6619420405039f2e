//! Error types for the EEW data model.

use thiserror::Error;

/// Errors raised while building or decoding data-model values.
#[derive(Debug, Error)]
pub enum TypesError {
    /// MessagePack serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[source] rmp_serde::encode::Error),

    /// MessagePack deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] rmp_serde::decode::Error),

    /// Event is missing a required field or has an out-of-range value
    #[error("malformed event: {0}")]
    Malformed(&'static str),

    /// Envelope version not understood by this node
    #[error("unsupported envelope version: {0}")]
    UnsupportedVersion(u8),

    /// Provider name not recognised
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = TypesError::Malformed("missing id");
        assert_eq!(err.to_string(), "malformed event: missing id");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TypesError>();
    }
}
