//! Extension to MIME type lookup for static files.

use std::path::Path;

pub const DEFAULT: &str = "application/octet-stream";

const TYPES: &[(&str, &str)] = &[
    ("html", "text/html"),
    ("css", "text/css"),
    ("js", "application/javascript"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("gif", "image/gif"),
    ("svg", "image/svg+xml"),
    ("json", "application/json"),
    ("pdf", "application/pdf"),
    ("txt", "text/plain"),
    ("ico", "image/x-icon"),
];

/// MIME type for `path` by extension. Matching is case-sensitive.
pub fn lookup(path: &Path) -> &'static str {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return DEFAULT;
    };
    TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map_or(DEFAULT, |(_, mime)| mime)
}
