//! Error types for request execution.

use thiserror::Error;

use crate::transport::TransportError;

/// Errors surfaced by [`XRequest::execute`](super::XRequest::execute).
///
/// HTTP-level failures (404, 500, ...) are not errors here: they resolve
/// normally and are reported by [`XResponse::error`](crate::XResponse::error).
#[derive(Debug, Error)]
pub enum RequestError {
    /// No transport backend could be constructed.
    #[error("could not create HTTP request object: {source}")]
    TransportUnavailable {
        /// The exhausted factory error.
        #[source]
        source: TransportError,
    },

    /// The transport reported a network-level failure. No detail is available.
    #[error("Network Error!")]
    Network,

    /// A method outside the supported set was requested.
    #[error("unsupported method: {method}")]
    UnsupportedMethod {
        /// The rejected method string.
        method: String,
    },
}

impl RequestError {
    /// Creates a transport-unavailable error.
    #[must_use]
    pub fn transport_unavailable(source: TransportError) -> Self {
        Self::TransportUnavailable { source }
    }

    /// Creates an unsupported method error.
    pub fn unsupported_method(method: impl Into<String>) -> Self {
        Self::UnsupportedMethod {
            method: method.into(),
        }
    }
}
