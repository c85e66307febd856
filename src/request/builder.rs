use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use data_encoding::BASE64;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{debug, instrument, warn};

use super::RequestError;
use crate::constants::{AUTH_HEADER, BINARY_CONTENT_TYPE, JSON_CONTENT_TYPE};
use crate::response::XResponse;
use crate::routes::resolve_route;
use crate::transport::{
    EventListener, ProgressEvent, ReadyState, RequestBody, ResponseType, TransportFactory,
};

/// Supported request methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
}

impl Method {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            _ => Err(RequestError::unsupported_method(s)),
        }
    }
}

/// User/password pair for [`XRequest::auth`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub user: Option<String>,
    pub pass: Option<String>,
}

impl Credentials {
    pub fn new(user: impl Into<String>, pass: impl Into<String>) -> Self {
        Self {
            user: Some(user.into()),
            pass: Some(pass.into()),
        }
    }
}

/// Configuration collected by an [`XRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestConfig {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub asynchronous: bool,
    pub with_credentials: bool,
    pub response_type: Option<ResponseType>,
    pub mime_type: Option<String>,
    /// Zero means no timeout.
    pub timeout: Duration,
    pub body: RequestBody,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            method: Method::Get,
            url: String::new(),
            headers: Vec::new(),
            asynchronous: true,
            with_credentials: false,
            response_type: None,
            mime_type: None,
            timeout: Duration::ZERO,
            body: RequestBody::Empty,
        }
    }
}

impl RequestConfig {
    /// Looks up a queued header, ignoring ASCII case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    fn set_header(&mut self, name: String, value: String) {
        match self
            .headers
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(&name))
        {
            Some(entry) => *entry = (name, value),
            None => self.headers.push((name, value)),
        }
    }
}

/// Fluent HTTP request builder.
///
/// Every setter consumes and returns the builder. Configuration mistakes
/// (unsupported methods, incomplete credentials, unknown response types) are
/// logged and ignored, leaving the previous configuration in place.
pub struct XRequest {
    config: RequestConfig,
    events: Vec<(String, Vec<EventListener>)>,
    factory: Arc<TransportFactory>,
}

impl fmt::Debug for XRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let events: Vec<(&str, usize)> = self
            .events
            .iter()
            .map(|(name, listeners)| (name.as_str(), listeners.len()))
            .collect();
        f.debug_struct("XRequest")
            .field("config", &self.config)
            .field("events", &events)
            .field("factory", &self.factory)
            .finish()
    }
}

impl Default for XRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl XRequest {
    /// Creates a `GET` request with the native transport chain.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: RequestConfig::default(),
            events: Vec::new(),
            factory: Arc::new(TransportFactory::native()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Event names with at least one listener, in registration order.
    pub fn event_names(&self) -> impl Iterator<Item = &str> {
        self.events.iter().map(|(name, _)| name.as_str())
    }

    #[must_use]
    pub fn listener_count(&self, name: &str) -> usize {
        self.events
            .iter()
            .find(|(registered, _)| registered == name)
            .map_or(0, |(_, listeners)| listeners.len())
    }

    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.config.url = url.into();
        self
    }

    /// Sets the method, case-insensitively. Anything but `GET`/`POST` is ignored.
    #[must_use]
    pub fn method(mut self, method: &str) -> Self {
        match method.parse::<Method>() {
            Ok(parsed) => self.config.method = parsed,
            Err(error) => warn!(error = %error, "ignoring method"),
        }
        self
    }

    /// Writes a Basic credential header when both user and pass are present.
    ///
    /// The header name is `WWW-Authenticate` with value `Basic realm=<base64>`,
    /// kept as-is for compatibility with existing servers.
    #[must_use]
    pub fn auth(self, credentials: &Credentials) -> Self {
        match (credentials.user.as_deref(), credentials.pass.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => {
                let encoded = BASE64.encode(format!("{user}:{pass}").as_bytes());
                self.header(AUTH_HEADER, format!("Basic realm={encoded}"))
            }
            _ => {
                debug!("incomplete credentials; auth header not written");
                self
            }
        }
    }

    #[must_use]
    pub fn async_mode(mut self, asynchronous: bool) -> Self {
        self.config.asynchronous = asynchronous;
        self
    }

    #[must_use]
    pub fn with_credentials(mut self, with_credentials: bool) -> Self {
        self.config.with_credentials = with_credentials;
        self
    }

    /// Sets one header, replacing an existing entry with the same name.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.set_header(name.into(), value.into());
        self
    }

    /// Merges every entry of `headers`.
    #[must_use]
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in headers {
            self.config.set_header(name.into(), value.into());
        }
        self
    }

    /// Registers a listener. Names may repeat; all listeners fire in
    /// registration order.
    #[must_use]
    pub fn on<F>(self, name: impl Into<String>, callback: F) -> Self
    where
        F: FnMut(&ProgressEvent) + Send + 'static,
    {
        self.on_many([(name.into(), Box::new(callback) as EventListener)])
    }

    /// Registers several listeners at once.
    #[must_use]
    pub fn on_many<I, K>(mut self, listeners: I) -> Self
    where
        I: IntoIterator<Item = (K, EventListener)>,
        K: Into<String>,
    {
        for (name, listener) in listeners {
            let name = name.into();
            match self.events.iter_mut().find(|(registered, _)| *registered == name) {
                Some((_, registered)) => registered.push(listener),
                None => self.events.push((name, vec![listener])),
            }
        }
        self
    }

    #[must_use]
    pub fn mime_type(mut self, mime: impl Into<String>) -> Self {
        self.config.mime_type = Some(mime.into());
        self
    }

    #[must_use]
    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.config.response_type = Some(response_type);
        self
    }

    /// Parses a response type by its wire name; unknown names are ignored.
    #[must_use]
    pub fn response_type_str(self, response_type: &str) -> Self {
        match response_type.parse::<ResponseType>() {
            Ok(parsed) => self.response_type(parsed),
            Err(error) => {
                warn!(error = %error, "ignoring response type");
                self
            }
        }
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Serializes `data` as the JSON body and sets the JSON content type.
    #[must_use]
    pub fn json<T: Serialize + ?Sized>(mut self, data: &T) -> Self {
        match serde_json::to_string(data) {
            Ok(text) => {
                self.config.body = RequestBody::Json(text);
                self.header("Content-Type", JSON_CONTENT_TYPE)
            }
            Err(error) => {
                warn!(error = %error, "JSON body not serializable; body unchanged");
                self
            }
        }
    }

    /// Uses `fields` as a form body. The content type is left to the transport.
    #[must_use]
    pub fn form<I, K, V>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.config.body = RequestBody::Form(
            fields
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        );
        self
    }

    /// Uses `data` as a raw binary body and sets the octet-stream content type.
    #[must_use]
    pub fn binary(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.config.body = RequestBody::Binary(data.into());
        self.header("Content-Type", BINARY_CONTENT_TYPE)
    }

    /// Replaces the transport constructor chain.
    #[must_use]
    pub fn transport_factory(mut self, factory: Arc<TransportFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// Runs the request and waits for the transport to finish.
    ///
    /// Resolves with a response once the transport reaches
    /// [`ReadyState::Done`], whatever the HTTP status. A transport timeout
    /// also resolves (with status 0); register a `timeout` listener to
    /// observe it.
    ///
    /// # Errors
    ///
    /// - [`RequestError::TransportUnavailable`] if no transport can be created
    /// - [`RequestError::Network`] if the transport reports a network failure
    #[instrument(skip(self), fields(method = %self.config.method, url = %self.config.url))]
    pub async fn execute(self) -> Result<XResponse, RequestError> {
        let Self {
            config,
            events,
            factory,
        } = self;

        let mut transport = factory
            .create_transport()
            .map_err(RequestError::transport_unavailable)?;
        debug!(backend = transport.name(), "executing request");

        // Listeners go on before open so early events are not missed.
        for (name, listeners) in events {
            let route = resolve_route(&name);
            for listener in listeners {
                transport.add_event_listener(route.channel, route.native_name, listener);
            }
        }

        let (sender, receiver) = oneshot::channel();
        let settle = Settle::new(sender);
        let on_done = settle.clone();
        transport.set_ready_state_handler(Box::new(move |state| {
            if state == ReadyState::Done {
                on_done.settle(Ok(()));
            }
        }));
        transport.set_error_handler(Box::new(move || settle.settle(Err(RequestError::Network))));

        if let Some(mime) = config.mime_type.as_deref() {
            transport.override_mime_type(mime);
        }
        if let Some(response_type) = config.response_type {
            // Applied through the same override call, after the mime type.
            transport.override_mime_type(response_type.as_str());
            transport.set_response_type(response_type);
        }
        transport.set_timeout(config.timeout);
        transport.open(config.method.as_str(), &config.url, config.asynchronous);
        transport.set_with_credentials(config.with_credentials);
        for (name, value) in &config.headers {
            transport.set_request_header(name, value);
        }
        transport.send(config.body);

        match receiver.await {
            Ok(Ok(())) => {
                debug!(status = transport.status(), "request complete");
                Ok(XResponse::new(transport))
            }
            Ok(Err(error)) => {
                debug!(error = %error, "request failed");
                Err(error)
            }
            Err(_) => Err(RequestError::Network),
        }
    }
}

/// Single-use completion slot shared by the readiness and error observers.
#[derive(Clone)]
struct Settle(Arc<Mutex<Option<oneshot::Sender<Result<(), RequestError>>>>>);

impl Settle {
    fn new(sender: oneshot::Sender<Result<(), RequestError>>) -> Self {
        Self(Arc::new(Mutex::new(Some(sender))))
    }

    fn settle(&self, outcome: Result<(), RequestError>) {
        let sender = self
            .0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(sender) = sender {
            let _ = sender.send(outcome);
        }
    }
}
