//! Transport capability consumed by the request builder.
//!
//! A [`Transport`] performs one request/response cycle. The builder only
//! talks to it through this narrow surface: open/send/abort, request header
//! setup, response header access, readiness and error notification, and the
//! main and upload event channels.
//!
//! # Architecture
//!
//! - [`Transport`] - capability trait every backend implements
//! - [`TransportFactory`] - ordered constructor list, first success wins
//! - [`NativeTransport`] - `reqwest`/`tokio` backed implementation
//! - [`ResponseBody`] / [`Blob`] - decoded response payloads

mod error;
pub mod factory;
pub mod native;

pub use error::TransportError;
pub use factory::TransportFactory;
pub use native::NativeTransport;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Event stream a listener is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Request/response events of the transport itself.
    Main,
    /// Events describing the request body upload.
    Upload,
}

/// Readiness state reported by a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ReadyState {
    #[default]
    Unsent,
    Opened,
    HeadersReceived,
    Loading,
    /// The request finished, successfully or not.
    Done,
}

/// How the transport should expose the response payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseType {
    /// Empty response type: the payload is exposed as text.
    #[default]
    Default,
    ArrayBuffer,
    Blob,
    Document,
    Json,
    Text,
}

impl ResponseType {
    /// Wire name of the response type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "",
            Self::ArrayBuffer => "arraybuffer",
            Self::Blob => "blob",
            Self::Document => "document",
            Self::Json => "json",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseType {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" => Ok(Self::Default),
            "arraybuffer" => Ok(Self::ArrayBuffer),
            "blob" => Ok(Self::Blob),
            "document" => Ok(Self::Document),
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            _ => Err(TransportError::unknown_response_type(s)),
        }
    }
}

/// Binary payload tagged with an optional content type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Blob {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl Blob {
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: None,
        }
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Response payload as exposed by a transport (or cached by a response wrapper).
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ResponseBody {
    /// Nothing received yet, or the payload could not be decoded.
    #[default]
    Empty,
    Text(String),
    Json(serde_json::Value),
    Blob(Blob),
    ArrayBuffer(Vec<u8>),
}

impl ResponseBody {
    /// Raw bytes of the payload, serializing structured JSON back to text.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Empty => Vec::new(),
            Self::Text(text) => text.as_bytes().to_vec(),
            Self::Json(value) => value.to_string().into_bytes(),
            Self::Blob(blob) => blob.bytes.clone(),
            Self::ArrayBuffer(bytes) => bytes.clone(),
        }
    }
}

/// Request payload handed to [`Transport::send`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    /// Serialized JSON document.
    Json(String),
    /// Key/value form fields, sent as multipart form data.
    Form(Vec<(String, String)>),
    Binary(Vec<u8>),
}

impl RequestBody {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Json(text) => text.is_empty(),
            Self::Form(fields) => fields.is_empty(),
            Self::Binary(bytes) => bytes.is_empty(),
        }
    }
}

/// Payload delivered to event listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Native event name, e.g. `progress` or `loadend`.
    pub event_type: String,
    pub loaded: u64,
    pub total: Option<u64>,
}

impl ProgressEvent {
    #[must_use]
    pub fn new(event_type: impl Into<String>, loaded: u64, total: Option<u64>) -> Self {
        Self {
            event_type: event_type.into(),
            loaded,
            total,
        }
    }

    #[must_use]
    pub fn length_computable(&self) -> bool {
        self.total.is_some()
    }
}

/// Callback attached to a transport channel under a native event name.
pub type EventListener = Box<dyn FnMut(&ProgressEvent) + Send>;

/// Observer invoked on every readiness state change.
pub type ReadyStateHandler = Box<dyn FnMut(ReadyState) + Send>;

/// Observer invoked when the transport hits a network-level failure.
pub type ErrorHandler = Box<dyn FnMut() + Send>;

/// Capability surface of a request/response transport.
///
/// Setters are infallible: a transport reports problems through its error
/// notification once the request is sent.
pub trait Transport: Send {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    fn open(&mut self, method: &str, url: &str, asynchronous: bool);

    fn send(&mut self, body: RequestBody);

    fn abort(&mut self);

    fn set_request_header(&mut self, name: &str, value: &str);

    /// Raw `name: value` header lines of the response, CRLF separated.
    fn all_response_headers(&self) -> String;

    /// Zero disables the timeout.
    fn set_timeout(&mut self, timeout: Duration);

    fn set_with_credentials(&mut self, with_credentials: bool);

    fn set_response_type(&mut self, response_type: ResponseType);

    fn response_type(&self) -> ResponseType;

    fn override_mime_type(&mut self, mime: &str);

    fn add_event_listener(&mut self, channel: Channel, event: &str, listener: EventListener);

    fn set_ready_state_handler(&mut self, handler: ReadyStateHandler);

    fn set_error_handler(&mut self, handler: ErrorHandler);

    fn ready_state(&self) -> ReadyState;

    fn status(&self) -> u16;

    fn status_text(&self) -> String;

    /// Payload decoded according to [`Transport::response_type`].
    fn response(&self) -> ResponseBody;

    fn response_text(&self) -> String;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_response_type_parses_wire_names() {
        assert_eq!("json".parse::<ResponseType>().unwrap(), ResponseType::Json);
        assert_eq!("Blob".parse::<ResponseType>().unwrap(), ResponseType::Blob);
        assert_eq!("".parse::<ResponseType>().unwrap(), ResponseType::Default);
        assert_eq!(
            "arraybuffer".parse::<ResponseType>().unwrap(),
            ResponseType::ArrayBuffer
        );
    }

    #[test]
    fn test_response_type_rejects_unknown_names() {
        let err = "stream".parse::<ResponseType>().unwrap_err();
        assert!(err.to_string().contains("stream"), "got: {err}");
    }

    #[test]
    fn test_response_body_to_bytes() {
        assert!(ResponseBody::Empty.to_bytes().is_empty());
        assert_eq!(ResponseBody::Text("hi".into()).to_bytes(), b"hi");
        assert_eq!(
            ResponseBody::Json(serde_json::json!({"a": 1})).to_bytes(),
            br#"{"a":1}"#
        );
        assert_eq!(ResponseBody::ArrayBuffer(vec![1, 2]).to_bytes(), vec![1, 2]);
    }

    #[test]
    fn test_request_body_emptiness() {
        assert!(RequestBody::Empty.is_empty());
        assert!(RequestBody::Form(Vec::new()).is_empty());
        assert!(!RequestBody::Binary(vec![0]).is_empty());
    }
}
