//! xrequest
//!
//! Fluent builder for issuing HTTP requests through a pluggable transport,
//! and a response wrapper that decodes headers, JSON, blobs and download
//! filenames lazily.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`transport`] - Transport capability, factory and the `reqwest` backend
//! - [`routes`] - Semantic event name → transport channel routing
//! - [`request`] - Fluent request builder and declarative options
//! - [`response`] - Lazily decoding response wrapper
//! - [`download`] - "Save as" side channel for response bodies

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod constants;
pub mod download;
pub mod request;
pub mod response;
pub mod routes;
pub mod transport;
mod user_agent;

// Re-export commonly used types
pub use download::{Anchor, DownloadError, DownloadHost, FsDownloadHost};
pub use request::{Credentials, Method, RequestConfig, RequestError, RequestOptions, XRequest};
pub use response::{ResponseError, XResponse};
pub use routes::{Route, resolve_route};
pub use transport::{
    Blob, Channel, ProgressEvent, ReadyState, RequestBody, ResponseBody, ResponseType, Transport,
    TransportError, TransportFactory,
};
