//! Event route table.
//!
//! Maps the semantic event names accepted by [`XRequest::on`](crate::XRequest::on)
//! onto the transport channel and native event name a listener is attached to.
//! Upload events are aliased onto the upload channel; every other name goes to
//! the main channel unchanged.

use crate::transport::Channel;

/// Where a listener registered under a semantic name is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route<'a> {
    pub channel: Channel,
    pub native_name: &'a str,
}

const UPLOAD_ROUTES: [(&str, &str); 7] = [
    ("uploadstart", "loadstart"),
    ("uploadend", "loadend"),
    ("uploadprogress", "progress"),
    ("uploadabort", "abort"),
    ("uploadcomplete", "load"),
    ("uploadtimeout", "timeout"),
    ("uploaderror", "error"),
];

/// Resolves `name` to its channel and native event name.
#[must_use]
pub fn resolve_route(name: &str) -> Route<'_> {
    UPLOAD_ROUTES
        .iter()
        .find(|(semantic, _)| *semantic == name)
        .map_or(
            Route {
                channel: Channel::Main,
                native_name: name,
            },
            |(_, native)| Route {
                channel: Channel::Upload,
                native_name: *native,
            },
        )
}

/// Semantic names routed to the upload channel.
pub fn upload_event_names() -> impl Iterator<Item = &'static str> {
    UPLOAD_ROUTES.iter().map(|(semantic, _)| *semantic)
}
