//! Temporary input files

use std::io::Write;
use tempfile::NamedTempFile;

/// Write `contents` to a fresh temporary `.json` file.
///
/// The file is removed when the returned handle is dropped.
pub fn input_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .prefix("awstbx-input-")
        .suffix(".json")
        .tempfile()
        .expect("Should create temp file");
    file.write_all(contents.as_bytes())
        .expect("Should write temp file");
    file.flush().expect("Should flush temp file");
    file
}
