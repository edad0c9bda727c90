//! Shared utilities: atomic file operations, progress display, and small
//! string/time helpers used when naming output artifacts.
//!
//! # Modules
//!
//! - [`fs`] - File system operations with atomic writes
//! - [`progress`] - Spinners for long-running capture operations

pub mod fs;
pub mod progress;

pub use fs::{atomic_write, ensure_dir};
pub use progress::Spinner;

use chrono::Utc;

/// Current UTC time formatted for embedding in file names (`YYYYMMDDTHHMMSS`).
pub fn timestamp_now_utc() -> String {
    Utc::now().format("%Y%m%dT%H%M%S").to_string()
}

/// Reduce an arbitrary resource name to a filesystem-safe fragment: ASCII
/// alphanumerics, `-` and `_` pass through, everything else becomes `_`.
pub fn to_safe_filename(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_filename_passes_through_safe_chars() {
        assert_eq!(to_safe_filename("my-instance_01"), "my-instance_01");
    }

    #[test]
    fn test_safe_filename_replaces_unsafe_chars() {
        assert_eq!(to_safe_filename("a b/c:d"), "a_b_c_d");
        assert_eq!(to_safe_filename("ünïcode"), "_n_code");
    }

    #[test]
    fn test_timestamp_shape() {
        let ts = timestamp_now_utc();
        assert_eq!(ts.len(), 15);
        assert_eq!(ts.as_bytes()[8], b'T');
    }
}
