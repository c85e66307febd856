//! Declarative request configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use super::{Credentials, XRequest};

/// Request settings that can be loaded from JSON (or any serde format) and
/// turned into a builder with [`XRequest::from_options`].
///
/// Field names follow the camelCase wire form, e.g. `responseType`,
/// `formData`, `withCredentials`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RequestOptions {
    pub url: Option<String>,
    pub method: Option<String>,
    #[serde(rename = "async")]
    pub asynchronous: Option<bool>,
    pub header: Option<BTreeMap<String, String>>,
    /// Milliseconds; zero disables the timeout.
    pub timeout: Option<u64>,
    pub response_type: Option<String>,
    #[serde(alias = "withCredential")]
    pub with_credentials: Option<bool>,
    pub mime_type: Option<String>,
    pub form_data: Option<BTreeMap<String, String>>,
    pub json_data: Option<serde_json::Value>,
    pub auth: Option<Credentials>,
}

impl XRequest {
    /// Builds a request by applying every present option through the
    /// fluent setters. A JSON body wins over a form body when both are given.
    #[must_use]
    pub fn from_options(options: RequestOptions) -> Self {
        let mut request = Self::new();
        if let Some(url) = options.url {
            request = request.url(url);
        }
        if let Some(method) = options.method.as_deref() {
            request = request.method(method);
        }
        if let Some(header) = options.header {
            request = request.headers(header);
        }
        if let Some(asynchronous) = options.asynchronous {
            request = request.async_mode(asynchronous);
        }
        if let Some(response_type) = options.response_type.as_deref() {
            request = request.response_type_str(response_type);
        }
        if let Some(form_data) = options.form_data {
            request = request.form(form_data);
        }
        if let Some(json_data) = options.json_data.as_ref() {
            request = request.json(json_data);
        }
        if let Some(auth) = options.auth.as_ref() {
            request = request.auth(auth);
        }
        if let Some(timeout) = options.timeout {
            request = request.timeout(Duration::from_millis(timeout));
        }
        if let Some(with_credentials) = options.with_credentials {
            request = request.with_credentials(with_credentials);
        }
        if let Some(mime_type) = options.mime_type {
            request = request.mime_type(mime_type);
        }
        request
    }
}
