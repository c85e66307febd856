//! Filename extraction from `Content-Disposition` headers.

use std::sync::LazyLock;

use regex::Regex;

/// Plain `filename=` parameter (not `filename*=`) with a quoted or unquoted value.
#[allow(clippy::expect_used)]
static FILENAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bfilename\s*=\s*("[^"\n]*"|'[^'\n]*'|[^;\n]*)"#)
        .expect("filename regex is valid") // Static pattern, safe to panic
});

/// Extracts the download filename from an attachment disposition.
///
/// Returns `None` for non-attachment dispositions or when no usable
/// filename token is present. Handles:
/// - `attachment; filename="example.pdf"`
/// - `attachment; filename=example.pdf`
/// - `attachment; filename*=UTF-8''example%20file.pdf` (RFC 5987)
#[must_use]
pub(crate) fn filename_from_disposition(disposition: &str) -> Option<String> {
    if !disposition.contains("attachment") {
        return None;
    }
    extended_filename(disposition).or_else(|| plain_filename(disposition))
}

fn extended_filename(disposition: &str) -> Option<String> {
    let start = disposition.find("filename*=")? + "filename*=".len();
    let value = disposition[start..].trim();
    // Format: charset'language'encoded_value
    let encoded = &value[value.find("''")? + 2..];
    let end = encoded.find(';').unwrap_or(encoded.len());
    let decoded = urlencoding::decode(encoded[..end].trim()).ok()?;
    let name = decoded.replace(['"', '\''], "");
    (!name.is_empty()).then_some(name)
}

fn plain_filename(disposition: &str) -> Option<String> {
    let value = FILENAME_PATTERN.captures(disposition)?.get(1)?.as_str();
    let name = value.replace(['"', '\''], "");
    (!name.is_empty()).then_some(name)
}
