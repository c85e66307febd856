//! `reqwest` backed transport.
//!
//! Requests run as tokio tasks. Progress, completion and failure are reported
//! through the listeners and handlers registered on the transport, following
//! the browser transport's event order: `readystatechange` first, then
//! `load`/`error`/`timeout`/`abort`, then `loadend`.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{CONTENT_TYPE, COOKIE, HeaderMap, SET_COOKIE};
use reqwest::{Client, ClientBuilder, Method, Proxy, RequestBuilder};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};
use url::Url;

use super::{
    Blob, Channel, ErrorHandler, EventListener, ProgressEvent, ReadyState, ReadyStateHandler,
    RequestBody, ResponseBody, ResponseType, Transport, TransportError,
};
use crate::constants::CONNECT_TIMEOUT_SECS;
use crate::user_agent;

/// How the HTTP client discovers proxies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyMode {
    /// Platform proxy discovery (may panic in restricted sandboxes).
    System,
    /// Only `HTTPS_PROXY`/`HTTP_PROXY`/`ALL_PROXY` environment variables.
    Environment,
    /// No proxy at all.
    Disabled,
}

impl ProxyMode {
    fn backend(self) -> &'static str {
        match self {
            Self::System => "native",
            Self::Environment => "env-proxy",
            Self::Disabled => "direct",
        }
    }
}

/// Transport performing requests with a `reqwest` client on the current tokio runtime.
pub struct NativeTransport {
    mode: ProxyMode,
    client: Client,
    runtime: Handle,
    jar: Arc<Jar>,
    shared: Arc<Shared>,
    pending: Option<PendingRequest>,
    task: Option<JoinHandle<()>>,
}

#[derive(Debug)]
struct PendingRequest {
    method: String,
    url: String,
    headers: Vec<(String, String)>,
}

impl std::fmt::Debug for NativeTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeTransport")
            .field("mode", &self.mode)
            .field("pending", &self.pending)
            .field("ready_state", &self.shared.lock_state().ready_state)
            .finish_non_exhaustive()
    }
}

impl NativeTransport {
    /// Creates a transport bound to the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Construct`] when called outside a tokio
    /// runtime or when the HTTP client cannot be built.
    pub fn new(mode: ProxyMode) -> Result<Self, TransportError> {
        Self::with_cookie_jar(mode, Arc::new(Jar::default()))
    }

    /// Creates a transport sharing `jar` for credentialed requests.
    ///
    /// # Errors
    ///
    /// Same as [`NativeTransport::new`].
    pub fn with_cookie_jar(mode: ProxyMode, jar: Arc<Jar>) -> Result<Self, TransportError> {
        let runtime = Handle::try_current()
            .map_err(|error| TransportError::construct(mode.backend(), error.to_string()))?;
        let client = build_client(mode)?;
        Ok(Self {
            mode,
            client,
            runtime,
            jar,
            shared: Arc::new(Shared::default()),
            pending: None,
            task: None,
        })
    }

    fn prepare(&self, request: PendingRequest, body: RequestBody) -> Result<Prepared, String> {
        let url = Url::parse(&request.url).map_err(|error| format!("invalid URL: {error}"))?;
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|error| format!("invalid method: {error}"))?;
        let (timeout, with_credentials) = {
            let state = self.shared.lock_state();
            (state.timeout, state.with_credentials)
        };

        let mut builder = self.client.request(method, url.clone());
        if !timeout.is_zero() {
            builder = builder.timeout(timeout);
        }
        if with_credentials && let Some(cookies) = self.jar.cookies(&url) {
            builder = builder.header(COOKIE, cookies);
        }

        let upload = (!body.is_empty()).then(|| match &body {
            RequestBody::Json(text) => Some(text.len() as u64),
            RequestBody::Binary(bytes) => Some(bytes.len() as u64),
            RequestBody::Form(_) | RequestBody::Empty => None,
        });
        builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Json(text) => builder.body(text),
            RequestBody::Binary(bytes) => builder.body(bytes),
            RequestBody::Form(fields) => {
                let form = fields
                    .into_iter()
                    .fold(reqwest::multipart::Form::new(), |form, (key, value)| {
                        form.text(key, value)
                    });
                builder.multipart(form)
            }
        };
        for (name, value) in request.headers {
            builder = builder.header(name, value);
        }

        Ok(Prepared {
            builder,
            url,
            upload,
            with_credentials,
        })
    }
}

fn build_client(mode: ProxyMode) -> Result<Client, TransportError> {
    catch_unwind(AssertUnwindSafe(|| {
        let builder = base_client_builder();
        let builder = match mode {
            ProxyMode::System => builder,
            ProxyMode::Environment => apply_env_proxy_fallback(builder.no_proxy()),
            ProxyMode::Disabled => builder.no_proxy(),
        };
        builder.build()
    }))
    .map_err(|_| {
        TransportError::construct(
            mode.backend(),
            "client builder panicked while loading proxy settings",
        )
    })?
    .map_err(|error| TransportError::construct(mode.backend(), error.to_string()))
}

fn base_client_builder() -> ClientBuilder {
    Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .user_agent(user_agent::default_user_agent())
        .gzip(true)
}

fn apply_env_proxy_fallback(mut builder: ClientBuilder) -> ClientBuilder {
    if let Some(proxy) = env_proxy_for_scheme("https")
        && let Ok(resolved) = Proxy::https(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    if let Some(proxy) = env_proxy_for_scheme("http")
        && let Ok(resolved) = Proxy::http(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    builder
}

fn env_proxy_for_scheme(scheme: &str) -> Option<String> {
    let names: &[&str] = match scheme {
        "https" => &["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"],
        "http" => &["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"],
        _ => return None,
    };
    names.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

struct Prepared {
    builder: RequestBuilder,
    url: Url,
    /// `Some` when a body is uploaded; the inner value is its size when known.
    upload: Option<Option<u64>>,
    with_credentials: bool,
}

#[derive(Default)]
struct State {
    ready_state: ReadyState,
    status: u16,
    status_text: String,
    raw_headers: String,
    content_type: Option<String>,
    body: Vec<u8>,
    response_type: ResponseType,
    mime_override: Option<String>,
    timeout: Duration,
    with_credentials: bool,
}

impl State {
    fn reset_response(&mut self) {
        self.status = 0;
        self.status_text.clear();
        self.raw_headers.clear();
        self.content_type = None;
        self.body.clear();
    }
}

#[derive(Default)]
struct Hooks {
    main: Vec<(String, EventListener)>,
    upload: Vec<(String, EventListener)>,
    on_ready: Option<ReadyStateHandler>,
    on_error: Option<ErrorHandler>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
    hooks: Mutex<Hooks>,
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_hooks(&self) -> MutexGuard<'_, Hooks> {
        self.hooks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatch(&self, channel: Channel, event: &ProgressEvent) {
        let mut hooks = self.lock_hooks();
        let listeners = match channel {
            Channel::Main => &mut hooks.main,
            Channel::Upload => &mut hooks.upload,
        };
        for (name, listener) in listeners.iter_mut() {
            if *name == event.event_type {
                run_observer(&event.event_type, || listener(event));
            }
        }
    }

    fn transition(&self, ready_state: ReadyState) {
        self.lock_state().ready_state = ready_state;
        self.notify_ready(ready_state);
    }

    fn notify_ready(&self, ready_state: ReadyState) {
        if let Some(handler) = self.lock_hooks().on_ready.as_mut() {
            run_observer("readystate", || handler(ready_state));
        }
        self.dispatch(Channel::Main, &ProgressEvent::new("readystatechange", 0, None));
    }

    fn finish(&self, outcome: &str) {
        {
            let mut state = self.lock_state();
            state.reset_response();
            state.ready_state = ReadyState::Done;
        }
        self.notify_ready(ReadyState::Done);
        self.dispatch(Channel::Main, &ProgressEvent::new(outcome, 0, None));
        self.dispatch(Channel::Main, &ProgressEvent::new("loadend", 0, None));
    }

    fn fail(&self, reason: &str) {
        debug!(reason, "transport network failure");
        {
            let mut state = self.lock_state();
            state.reset_response();
            state.ready_state = ReadyState::Done;
        }
        // The error observer runs ahead of the readiness observer so that a
        // network failure is never reported as a completed response.
        if let Some(handler) = self.lock_hooks().on_error.as_mut() {
            run_observer("error", handler);
        }
        self.notify_ready(ReadyState::Done);
        self.dispatch(Channel::Main, &ProgressEvent::new("error", 0, None));
        self.dispatch(Channel::Main, &ProgressEvent::new("loadend", 0, None));
    }

    fn fail_with(&self, error: &reqwest::Error) {
        if error.is_timeout() {
            debug!(error = %error, "transport timed out");
            self.finish("timeout");
        } else {
            self.fail(&error.to_string());
        }
    }

    fn decoded_response(&self) -> ResponseBody {
        let state = self.lock_state();
        if state.ready_state != ReadyState::Done {
            return ResponseBody::Empty;
        }
        match state.response_type {
            ResponseType::Default | ResponseType::Text | ResponseType::Document => {
                ResponseBody::Text(String::from_utf8_lossy(&state.body).into_owned())
            }
            ResponseType::Json => serde_json::from_slice(&state.body)
                .map_or(ResponseBody::Empty, ResponseBody::Json),
            ResponseType::Blob => {
                let blob = Blob::new(state.body.clone());
                match state.mime_override.as_ref().or(state.content_type.as_ref()) {
                    Some(content_type) => ResponseBody::Blob(blob.with_content_type(content_type)),
                    None => ResponseBody::Blob(blob),
                }
            }
            ResponseType::ArrayBuffer => ResponseBody::ArrayBuffer(state.body.clone()),
        }
    }
}

/// Runs a caller-supplied observer. A panicking observer is logged and the
/// request carries on, so completion is still reported.
fn run_observer(event: &str, observer: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(observer)).is_err() {
        warn!(event, "event listener panicked; continuing");
    }
}

/// One `name: value` line per header name; repeated values are comma-joined.
fn format_headers(headers: &HeaderMap) -> String {
    headers
        .keys()
        .map(|name| {
            let values: Vec<_> = headers
                .get_all(name)
                .iter()
                .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
                .collect();
            format!("{name}: {}\r\n", values.join(", "))
        })
        .collect()
}

#[instrument(level = "debug", skip_all, fields(url = %prepared.url))]
async fn run_request(shared: Arc<Shared>, jar: Arc<Jar>, prepared: Prepared) {
    let Prepared {
        builder,
        url,
        upload,
        with_credentials,
    } = prepared;

    shared.dispatch(Channel::Main, &ProgressEvent::new("loadstart", 0, None));
    if let Some(total) = upload {
        shared.dispatch(Channel::Upload, &ProgressEvent::new("loadstart", 0, total));
    }

    let response = match builder.send().await {
        Ok(response) => response,
        Err(error) => {
            shared.fail_with(&error);
            return;
        }
    };

    if let Some(total) = upload {
        let sent = total.unwrap_or(0);
        for event in ["progress", "load", "loadend"] {
            shared.dispatch(Channel::Upload, &ProgressEvent::new(event, sent, total));
        }
    }

    if with_credentials {
        let mut set_cookies = response.headers().get_all(SET_COOKIE).iter().peekable();
        if set_cookies.peek().is_some() {
            jar.set_cookies(&mut set_cookies, &url);
        }
    }

    {
        let mut state = shared.lock_state();
        state.status = response.status().as_u16();
        state.status_text = response
            .status()
            .canonical_reason()
            .unwrap_or_default()
            .to_string();
        state.raw_headers = format_headers(response.headers());
        state.content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
    }
    debug!(status = response.status().as_u16(), "response headers received");
    shared.transition(ReadyState::HeadersReceived);

    let total = response.content_length();
    let mut loaded: u64 = 0;
    let mut stream = response.bytes_stream();
    shared.transition(ReadyState::Loading);
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => {
                loaded += bytes.len() as u64;
                shared.lock_state().body.extend_from_slice(&bytes);
                shared.dispatch(Channel::Main, &ProgressEvent::new("progress", loaded, total));
            }
            Err(error) => {
                shared.fail_with(&error);
                return;
            }
        }
    }

    shared.transition(ReadyState::Done);
    shared.dispatch(Channel::Main, &ProgressEvent::new("load", loaded, total));
    shared.dispatch(Channel::Main, &ProgressEvent::new("loadend", loaded, total));
}

impl Transport for NativeTransport {
    fn name(&self) -> &'static str {
        self.mode.backend()
    }

    fn open(&mut self, method: &str, url: &str, asynchronous: bool) {
        if !asynchronous {
            debug!("synchronous mode requested; request still runs on the tokio runtime");
        }
        self.pending = Some(PendingRequest {
            method: method.to_string(),
            url: url.to_string(),
            headers: Vec::new(),
        });
        self.shared.lock_state().reset_response();
        self.shared.transition(ReadyState::Opened);
    }

    fn send(&mut self, body: RequestBody) {
        let Some(request) = self.pending.take() else {
            warn!("send called before open");
            self.shared.fail("send called before open");
            return;
        };
        match self.prepare(request, body) {
            Ok(prepared) => {
                let shared = Arc::clone(&self.shared);
                let jar = Arc::clone(&self.jar);
                self.task = Some(self.runtime.spawn(run_request(shared, jar, prepared)));
            }
            Err(reason) => {
                // Reported asynchronously, like any other network failure.
                let shared = Arc::clone(&self.shared);
                self.task = Some(self.runtime.spawn(async move { shared.fail(&reason) }));
            }
        }
    }

    fn abort(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        if task.is_finished() {
            return;
        }
        task.abort();
        debug!("request aborted");
        self.shared.finish("abort");
    }

    fn set_request_header(&mut self, name: &str, value: &str) {
        match self.pending.as_mut() {
            Some(request) => request.headers.push((name.to_string(), value.to_string())),
            None => warn!(header = name, "request header set before open; ignored"),
        }
    }

    fn all_response_headers(&self) -> String {
        self.shared.lock_state().raw_headers.clone()
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.shared.lock_state().timeout = timeout;
    }

    fn set_with_credentials(&mut self, with_credentials: bool) {
        self.shared.lock_state().with_credentials = with_credentials;
    }

    fn set_response_type(&mut self, response_type: ResponseType) {
        self.shared.lock_state().response_type = response_type;
    }

    fn response_type(&self) -> ResponseType {
        self.shared.lock_state().response_type
    }

    fn override_mime_type(&mut self, mime: &str) {
        if !mime.contains('/') {
            debug!(mime, "not a MIME type; override ignored");
            return;
        }
        self.shared.lock_state().mime_override = Some(mime.to_string());
    }

    fn add_event_listener(&mut self, channel: Channel, event: &str, listener: EventListener) {
        let mut hooks = self.shared.lock_hooks();
        let listeners = match channel {
            Channel::Main => &mut hooks.main,
            Channel::Upload => &mut hooks.upload,
        };
        listeners.push((event.to_string(), listener));
    }

    fn set_ready_state_handler(&mut self, handler: ReadyStateHandler) {
        self.shared.lock_hooks().on_ready = Some(handler);
    }

    fn set_error_handler(&mut self, handler: ErrorHandler) {
        self.shared.lock_hooks().on_error = Some(handler);
    }

    fn ready_state(&self) -> ReadyState {
        self.shared.lock_state().ready_state
    }

    fn status(&self) -> u16 {
        self.shared.lock_state().status
    }

    fn status_text(&self) -> String {
        self.shared.lock_state().status_text.clone()
    }

    fn response(&self) -> ResponseBody {
        self.shared.decoded_response()
    }

    fn response_text(&self) -> String {
        String::from_utf8_lossy(&self.shared.lock_state().body).into_owned()
    }
}
