//! Error types for the download side channel.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while handing a response body to a download host.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The anchor points at an object URL the host never issued (or revoked).
    #[error("unknown object URL: {url}")]
    UnknownObjectUrl {
        /// The unresolved object URL.
        url: String,
    },

    /// File system error while saving the download.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl DownloadError {
    /// Creates an unknown object URL error.
    pub fn unknown_object_url(url: impl Into<String>) -> Self {
        Self::UnknownObjectUrl { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
