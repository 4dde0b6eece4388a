//! Checks an upload must pass before a job is created for it.

use std::path::Path;

use crate::error::UploadError;

/// How much of the upload is sniffed for binary content.
const SNIFF_LEN: usize = 512;

/// Minimum share of printable bytes in the sniffed prefix.
const MIN_PRINTABLE_RATIO: f64 = 0.95;

/// Validates an uploaded file: size cap, `.csv` extension, non-empty and
/// text-like content, in that order.
pub fn validate_upload(filename: &str, contents: &[u8], max_size: u64) -> Result<(), UploadError> {
    let size = contents.len() as u64;
    if size > max_size {
        return Err(UploadError::TooLarge {
            size,
            max: max_size,
        });
    }
    if !has_csv_extension(filename) {
        return Err(UploadError::InvalidExtension);
    }
    if contents.is_empty() {
        return Err(UploadError::Empty);
    }
    if !looks_like_text(&contents[..contents.len().min(SNIFF_LEN)]) {
        return Err(UploadError::NotText);
    }
    Ok(())
}

pub fn has_csv_extension(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

/// No NUL bytes and mostly printable ASCII, tab, CR or LF.
pub fn looks_like_text(data: &[u8]) -> bool {
    if data.is_empty() || data.contains(&0) {
        return false;
    }
    let printable = data
        .iter()
        .filter(|&&b| (32..=126).contains(&b) || b == b'\t' || b == b'\n' || b == b'\r')
        .count();
    printable as f64 / data.len() as f64 >= MIN_PRINTABLE_RATIO
}
