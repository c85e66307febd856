//! Error types for response decoding.

use thiserror::Error;

/// Errors raised while decoding a response body.
#[derive(Debug, Error)]
pub enum ResponseError {
    /// The body is not valid JSON.
    #[error("malformed JSON body: {source}")]
    MalformedJson {
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The JSON body does not match the requested type.
    #[error("JSON body does not match {target}: {source}")]
    UnexpectedShape {
        /// Name of the requested type.
        target: &'static str,
        /// The underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },
}

impl ResponseError {
    /// Creates a malformed JSON error.
    #[must_use]
    pub fn malformed_json(source: serde_json::Error) -> Self {
        Self::MalformedJson { source }
    }

    /// Creates a shape mismatch error for type `T`.
    #[must_use]
    pub fn unexpected_shape<T>(source: serde_json::Error) -> Self {
        Self::UnexpectedShape {
            target: std::any::type_name::<T>(),
            source,
        }
    }
}
