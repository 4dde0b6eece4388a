//! Helpers for cleaning untrusted names and keeping paths out of logs.

use std::path::Path;

const UNSAFE_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Makes an uploaded file name safe to embed in a storage name.
///
/// `..` sequences and path/shell-significant characters become `_`. A name
/// left empty (or nothing but underscores) falls back to `file.csv`.
///
/// - `test/file\name:*.csv` → `test_file_name__.csv`
/// - `../../../etc/passwd` → `______etc_passwd`
pub fn sanitize_filename(filename: &str) -> String {
    let sanitized = filename
        .replace("..", "_")
        .replace(&UNSAFE_CHARS[..], "_");

    if sanitized.trim().trim_matches('_').is_empty() {
        return "file.csv".to_string();
    }
    sanitized
}

/// Returns only the file name component of a location.
///
/// Safe for span fields: reveals the file name without the directory layout.
pub fn redact_path(location: impl AsRef<Path>) -> String {
    location
        .as_ref()
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}
