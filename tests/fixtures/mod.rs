//! Recorded Jenkins payloads for decoder tests

use std::fs;
use std::path::{Path, PathBuf};

/// Path to a payload fixture under tests/fixtures/payloads
pub fn payload_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/payloads")
        .join(name)
}

/// Read a payload fixture as a string
pub fn load_payload(name: &str) -> String {
    let path = payload_path(name);
    fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read fixture {}: {}", path.display(), e))
}
