//! Scripted in-memory transport that records every capability call.
//!
//! On `send` the transport fires its scripted events synchronously, then
//! settles according to its [`Outcome`].

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use xrequest::transport::{EventListener, ErrorHandler, ReadyStateHandler};
use xrequest::{
    Channel, ProgressEvent, ReadyState, RequestBody, ResponseBody, ResponseType, Transport,
    TransportFactory,
};

/// Capability call recorded by [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    AddListener(Channel, String),
    SetReadyStateHandler,
    SetErrorHandler,
    OverrideMimeType(String),
    SetResponseType(ResponseType),
    SetTimeout(Duration),
    Open {
        method: String,
        url: String,
        asynchronous: bool,
    },
    SetWithCredentials(bool),
    SetRequestHeader(String, String),
    Send(RequestBody),
}

/// How the transport finishes once sent.
#[derive(Debug, Clone)]
pub enum Outcome {
    Complete {
        status: u16,
        status_text: String,
        headers: String,
        body: String,
    },
    NetworkError,
}

impl Outcome {
    pub fn complete(status: u16, status_text: &str, headers: &str, body: &str) -> Self {
        Self::Complete {
            status,
            status_text: status_text.to_string(),
            headers: headers.to_string(),
            body: body.to_string(),
        }
    }
}

pub struct MockState {
    pub calls: Vec<Call>,
    pub script: Vec<(Channel, ProgressEvent)>,
    pub outcome: Outcome,
    pub created: usize,
    listeners: Vec<(Channel, String, EventListener)>,
    on_ready: Option<ReadyStateHandler>,
    on_error: Option<ErrorHandler>,
    ready_state: ReadyState,
    status: u16,
    status_text: String,
    headers: String,
    body: String,
    response_type: ResponseType,
}

impl MockState {
    fn fire(&mut self, channel: Channel, event: &ProgressEvent) {
        for (registered_channel, name, listener) in &mut self.listeners {
            if *registered_channel == channel && *name == event.event_type {
                listener(event);
            }
        }
    }
}

/// Handle shared between a test and the transports its factory creates.
#[derive(Clone)]
pub struct MockHandle(Arc<Mutex<MockState>>);

impl MockHandle {
    pub fn new(outcome: Outcome) -> Self {
        Self(Arc::new(Mutex::new(MockState {
            calls: Vec::new(),
            script: Vec::new(),
            outcome,
            created: 0,
            listeners: Vec::new(),
            on_ready: None,
            on_error: None,
            ready_state: ReadyState::Unsent,
            status: 0,
            status_text: String::new(),
            headers: String::new(),
            body: String::new(),
            response_type: ResponseType::Default,
        })))
    }

    /// Events fired (in order) when the request is sent.
    pub fn with_script(self, script: Vec<(Channel, ProgressEvent)>) -> Self {
        self.state().script = script;
        self
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.0.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn factory(&self) -> Arc<TransportFactory> {
        let handle = self.clone();
        Arc::new(TransportFactory::new().with_constructor("mock", move || {
            handle.state().created += 1;
            Ok(Box::new(MockTransport(handle.clone())) as Box<dyn Transport>)
        }))
    }
}

pub struct MockTransport(MockHandle);

impl MockTransport {
    fn record(&self, call: Call) {
        self.0.state().calls.push(call);
    }
}

impl Transport for MockTransport {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn open(&mut self, method: &str, url: &str, asynchronous: bool) {
        self.record(Call::Open {
            method: method.to_string(),
            url: url.to_string(),
            asynchronous,
        });
        self.0.state().ready_state = ReadyState::Opened;
    }

    fn send(&mut self, body: RequestBody) {
        self.record(Call::Send(body));
        let mut state = self.0.state();
        let script = std::mem::take(&mut state.script);
        for (channel, event) in &script {
            state.fire(*channel, event);
        }
        state.ready_state = ReadyState::Done;
        match state.outcome.clone() {
            Outcome::Complete {
                status,
                status_text,
                headers,
                body,
            } => {
                state.status = status;
                state.status_text = status_text;
                state.headers = headers;
                state.body = body;
                if let Some(handler) = state.on_ready.as_mut() {
                    handler(ReadyState::Done);
                }
                state.fire(Channel::Main, &ProgressEvent::new("load", 0, None));
            }
            Outcome::NetworkError => {
                if let Some(handler) = state.on_error.as_mut() {
                    handler();
                }
                if let Some(handler) = state.on_ready.as_mut() {
                    handler(ReadyState::Done);
                }
                state.fire(Channel::Main, &ProgressEvent::new("error", 0, None));
            }
        }
        state.fire(Channel::Main, &ProgressEvent::new("loadend", 0, None));
    }

    fn abort(&mut self) {}

    fn set_request_header(&mut self, name: &str, value: &str) {
        self.record(Call::SetRequestHeader(name.to_string(), value.to_string()));
    }

    fn all_response_headers(&self) -> String {
        self.0.state().headers.clone()
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.record(Call::SetTimeout(timeout));
    }

    fn set_with_credentials(&mut self, with_credentials: bool) {
        self.record(Call::SetWithCredentials(with_credentials));
    }

    fn set_response_type(&mut self, response_type: ResponseType) {
        self.record(Call::SetResponseType(response_type));
        self.0.state().response_type = response_type;
    }

    fn response_type(&self) -> ResponseType {
        self.0.state().response_type
    }

    fn override_mime_type(&mut self, mime: &str) {
        self.record(Call::OverrideMimeType(mime.to_string()));
    }

    fn add_event_listener(&mut self, channel: Channel, event: &str, listener: EventListener) {
        self.record(Call::AddListener(channel, event.to_string()));
        self.0
            .state()
            .listeners
            .push((channel, event.to_string(), listener));
    }

    fn set_ready_state_handler(&mut self, handler: ReadyStateHandler) {
        self.record(Call::SetReadyStateHandler);
        self.0.state().on_ready = Some(handler);
    }

    fn set_error_handler(&mut self, handler: ErrorHandler) {
        self.record(Call::SetErrorHandler);
        self.0.state().on_error = Some(handler);
    }

    fn ready_state(&self) -> ReadyState {
        self.0.state().ready_state
    }

    fn status(&self) -> u16 {
        self.0.state().status
    }

    fn status_text(&self) -> String {
        self.0.state().status_text.clone()
    }

    fn response(&self) -> ResponseBody {
        let state = self.0.state();
        match state.response_type {
            ResponseType::Json => serde_json::from_str(&state.body)
                .map_or(ResponseBody::Empty, ResponseBody::Json),
            _ => ResponseBody::Text(state.body.clone()),
        }
    }

    fn response_text(&self) -> String {
        self.0.state().body.clone()
    }
}
