//! Shared defaults (content types, filenames, client timeouts).

/// Content type written by the JSON body helper.
pub const JSON_CONTENT_TYPE: &str = "application/json;charset=UTF-8";

/// Content type written by the binary body helper.
pub const BINARY_CONTENT_TYPE: &str = "application/octet-stream";

/// Header carrying the Basic credentials written by the auth helper.
pub const AUTH_HEADER: &str = "WWW-Authenticate";

/// Filename used when a response carries no attachment disposition.
pub const DEFAULT_FILENAME: &str = "response.bin";

/// Connect timeout of the native transport's HTTP client (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;
