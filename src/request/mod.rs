//! Fluent request builder.
//!
//! [`XRequest`] collects the request configuration through chainable setters
//! and turns it into a transport invocation with [`XRequest::execute`].
//!
//! # Example
//!
//! ```no_run
//! use xrequest::XRequest;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut response = XRequest::new()
//!     .url("https://example.com/health")
//!     .method("get")
//!     .on("progress", |event| println!("{} bytes", event.loaded))
//!     .execute()
//!     .await?;
//!
//! if let Some(status_text) = response.error() {
//!     eprintln!("request failed: {status_text}");
//! } else {
//!     println!("{}", response.json()?);
//! }
//! # Ok(())
//! # }
//! ```

mod builder;
mod error;
mod options;

pub use builder::{Credentials, Method, RequestConfig, XRequest};
pub use error::RequestError;
pub use options::RequestOptions;
