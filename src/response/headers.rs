//! Raw response header parsing.

use std::collections::HashMap;

/// Parses a raw header blob into a lower-cased name → value map.
///
/// Lines are split on CR/LF and then on the first colon. Names are trimmed
/// and lower-cased, values trimmed. A line without a colon yields an empty
/// value. Later duplicates overwrite earlier ones.
#[must_use]
pub fn parse_headers(raw: &str) -> HashMap<String, String> {
    raw.trim()
        .split(['\r', '\n'])
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let (name, value) = line.split_once(':').unwrap_or((line, ""));
            (name.trim().to_lowercase(), value.trim().to_string())
        })
        .collect()
}
