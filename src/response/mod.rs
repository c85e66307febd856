//! Response wrapper over a finished transport.
//!
//! [`XResponse`] decodes lazily: headers and the filename are parsed on first
//! access and cached for the lifetime of the response, while `json()` and
//! `blob()` cache their decoded value as the response `result`.
//!
//! The caches are plain cells; an `XResponse` is meant to be read from one
//! task at a time.

mod error;
mod filename;
mod headers;

pub use error::ResponseError;
pub use headers::parse_headers;

use std::cell::OnceCell;
use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::constants::DEFAULT_FILENAME;
use crate::download::{Anchor, DownloadError, DownloadHost};
use crate::transport::{Blob, ResponseBody, ResponseType, Transport};
use filename::filename_from_disposition;

/// Decoding facade over a completed [`Transport`].
pub struct XResponse {
    transport: Box<dyn Transport>,
    result: Option<ResponseBody>,
    headers: OnceCell<HashMap<String, String>>,
    filename: OnceCell<String>,
    blob_url: Option<String>,
}

impl fmt::Debug for XResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XResponse")
            .field("transport", &self.transport.name())
            .field("status", &self.transport.status())
            .field("result", &self.result)
            .field("blob_url", &self.blob_url)
            .finish_non_exhaustive()
    }
}

impl XResponse {
    /// Wraps a transport that reached the done state.
    #[must_use]
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            result: None,
            headers: OnceCell::new(),
            filename: OnceCell::new(),
            blob_url: None,
        }
    }

    /// The underlying transport.
    #[must_use]
    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// The last decoded value, or the transport's native response.
    #[must_use]
    pub fn result(&self) -> ResponseBody {
        self.result
            .clone()
            .unwrap_or_else(|| self.transport.response())
    }

    /// Response headers keyed by lower-cased name, parsed once.
    pub fn headers(&self) -> &HashMap<String, String> {
        self.headers
            .get_or_init(|| parse_headers(&self.transport.all_response_headers()))
    }

    /// Looks up one header by name, ignoring case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers()
            .get(&name.to_lowercase())
            .map(String::as_str)
    }

    /// Download filename from an attachment `Content-Disposition`, or
    /// `response.bin`.
    pub fn filename(&self) -> &str {
        self.filename.get_or_init(|| {
            self.header("content-disposition")
                .and_then(filename_from_disposition)
                .unwrap_or_else(|| DEFAULT_FILENAME.to_string())
        })
    }

    /// `None` for status 200, otherwise the status text.
    ///
    /// Any other status, including other 2xx and 3xx codes, counts as an error.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        (self.transport.status() != 200).then(|| self.transport.status_text())
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.transport.status()
    }

    #[must_use]
    pub fn status_text(&self) -> String {
        self.transport.status_text()
    }

    /// Raw body decoded as text.
    #[must_use]
    pub fn text(&self) -> String {
        self.transport.response_text()
    }

    /// Decodes the body as JSON and caches it as the result.
    ///
    /// A transport configured with the JSON response type has already parsed
    /// the body; its value is used as-is (`null` when it was invalid).
    ///
    /// # Errors
    ///
    /// Returns [`ResponseError::MalformedJson`] when the text body is not JSON.
    pub fn json(&mut self) -> Result<serde_json::Value, ResponseError> {
        let value = if self.transport.response_type() == ResponseType::Json {
            match self.transport.response() {
                ResponseBody::Json(value) => value,
                _ => serde_json::Value::Null,
            }
        } else {
            serde_json::from_str(&self.transport.response_text())
                .map_err(ResponseError::malformed_json)?
        };
        self.result = Some(ResponseBody::Json(value.clone()));
        Ok(value)
    }

    /// Decodes the JSON body into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ResponseError::MalformedJson`] for invalid JSON and
    /// [`ResponseError::UnexpectedShape`] when it does not fit `T`.
    pub fn json_as<T: DeserializeOwned>(&mut self) -> Result<T, ResponseError> {
        serde_json::from_value(self.json()?).map_err(ResponseError::unexpected_shape::<T>)
    }

    /// Returns the body as a blob and caches it as the result.
    pub fn blob(&mut self) -> Blob {
        let response = self.transport.response();
        let blob = match response {
            ResponseBody::Blob(blob) if self.transport.response_type() == ResponseType::Blob => {
                blob
            }
            other => Blob::new(other.to_bytes()),
        };
        self.result = Some(ResponseBody::Blob(blob.clone()));
        blob
    }

    /// Hands the body to `host` as a "save as" download named [`filename`](Self::filename).
    ///
    /// The object URL is created once and reused by later calls.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError`] when the host cannot register or save the blob.
    pub fn download(&mut self, host: &dyn DownloadHost) -> Result<(), DownloadError> {
        let href = match &self.blob_url {
            Some(url) => url.clone(),
            None => {
                let blob = self.blob();
                let url = host.create_object_url(&blob)?;
                self.blob_url = Some(url.clone());
                url
            }
        };
        let anchor = Anchor::new(href, self.filename());
        debug!(filename = %anchor.download, "triggering download");
        host.activate(&anchor)
    }
}
