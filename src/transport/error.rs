//! Error types for transport construction and configuration.

use thiserror::Error;

/// Errors raised while constructing or configuring a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// A single backend constructor failed.
    #[error("transport backend {backend} unavailable: {reason}")]
    Construct {
        /// Name of the backend that failed.
        backend: &'static str,
        /// Why construction failed.
        reason: String,
    },

    /// Every backend constructor failed.
    #[error("could not create HTTP request object (tried: {})", attempted.join(", "))]
    Unavailable {
        /// Backends attempted, in order.
        attempted: Vec<&'static str>,
    },

    /// A response type name the transport does not recognize.
    #[error("unknown response type: {name:?}")]
    UnknownResponseType {
        /// The rejected name.
        name: String,
    },
}

impl TransportError {
    /// Creates a backend construction error.
    pub fn construct(backend: &'static str, reason: impl Into<String>) -> Self {
        Self::Construct {
            backend,
            reason: reason.into(),
        }
    }

    /// Creates an error for an exhausted constructor list.
    #[must_use]
    pub fn unavailable(attempted: Vec<&'static str>) -> Self {
        Self::Unavailable { attempted }
    }

    /// Creates an unknown response type error.
    pub fn unknown_response_type(name: impl Into<String>) -> Self {
        Self::UnknownResponseType { name: name.into() }
    }
}
