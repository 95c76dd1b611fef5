//! Utility functions

use serde::{Deserialize, Serialize};

/// Version information for the daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Get version information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

/// Return the trailing `max_bytes` of a captured output stream as a string.
///
/// Deploy scripts can produce arbitrarily large output; only the tail is
/// kept for logging. Truncation is byte-based and re-aligned to a UTF-8
/// boundary so the result is always valid text.
pub fn tail_str(bytes: &[u8], max_bytes: usize) -> String {
    let start = bytes.len().saturating_sub(max_bytes);
    let mut tail = &bytes[start..];
    while !tail.is_empty() && std::str::from_utf8(tail).is_err() {
        tail = &tail[1..];
    }
    String::from_utf8_lossy(tail).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_str_shorter_than_limit() {
        assert_eq!(tail_str(b"hello", 500), "hello");
    }

    #[test]
    fn test_tail_str_truncates_to_tail() {
        assert_eq!(tail_str(b"0123456789", 4), "6789");
    }

    #[test]
    fn test_tail_str_realigns_utf8_boundary() {
        // Cutting through 'é' must not produce invalid text
        let tail = tail_str("aé".as_bytes(), 1);
        assert_eq!(tail, "");
    }

    #[test]
    fn test_version_info_has_version() {
        let version = version_info();
        assert!(!version.version.is_empty());
    }
}
