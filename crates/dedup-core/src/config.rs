/// Runtime configuration for a dedup session.
///
/// Every field has a default, so an empty JSON object (or no file at all)
/// yields a working configuration.
use crate::error::{DedupError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default size of each fingerprint window: 256 KiB.
pub const DEFAULT_HASH_WINDOW: u64 = 256 * 1024;

/// Default name of the cache file stored at the archive root.
pub const DEFAULT_CACHE_FILE: &str = ".meta.csv";

/// Folders whose name starts with this prefix are never scanned.
pub const DEFAULT_RESERVED_PREFIX: &str = "~~~";

/// Default capacity of the scan-event inbox.
///
/// The session drains the inbox on every frame; a full inbox blocks the
/// scanner until the next drain.
pub const DEFAULT_INBOX_CAPACITY: usize = 4_096;

/// How file contents are turned into fingerprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum HashPolicy {
    /// Hash a head window and, for large files, a tail window.
    ///
    /// Two different files with identical windows and size are reported as
    /// duplicates.
    Fast { window: u64 },
    /// Hash the complete contents.
    Exact,
}

impl Default for HashPolicy {
    fn default() -> Self {
        Self::Fast {
            window: DEFAULT_HASH_WINDOW,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    pub hash_policy: HashPolicy,
    pub cache_file_name: String,
    pub reserved_prefix: String,
    pub inbox_capacity: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            hash_policy: HashPolicy::default(),
            cache_file_name: DEFAULT_CACHE_FILE.to_string(),
            reserved_prefix: DEFAULT_RESERVED_PREFIX.to_string(),
            inbox_capacity: DEFAULT_INBOX_CAPACITY,
        }
    }
}

impl DedupConfig {
    /// Parse a configuration from JSON text and validate it.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_json(&text),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(DedupError::io(path, err)),
        }
    }

    /// Reject values that would make the scanner misbehave.
    pub fn validate(&self) -> Result<()> {
        if let HashPolicy::Fast { window } = self.hash_policy {
            if window == 0 {
                return Err(DedupError::Config("hash window must be non-zero".into()));
            }
        }
        if self.cache_file_name.is_empty() || self.cache_file_name.contains(['/', '\\']) {
            return Err(DedupError::Config(format!(
                "cache file name {:?} must be a plain file name",
                self.cache_file_name
            )));
        }
        if self.inbox_capacity == 0 {
            return Err(DedupError::Config("inbox capacity must be non-zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config = DedupConfig::from_json("{}").unwrap();
        assert_eq!(config, DedupConfig::default());
        assert_eq!(
            config.hash_policy,
            HashPolicy::Fast {
                window: DEFAULT_HASH_WINDOW
            }
        );
    }

    #[test]
    fn exact_policy_parses() {
        let config = DedupConfig::from_json(r#"{"hash_policy": {"mode": "exact"}}"#).unwrap();
        assert_eq!(config.hash_policy, HashPolicy::Exact);
        assert_eq!(config.reserved_prefix, DEFAULT_RESERVED_PREFIX);
    }

    #[test]
    fn zero_window_is_rejected() {
        let err = DedupConfig::from_json(r#"{"hash_policy": {"mode": "fast", "window": 0}}"#)
            .unwrap_err();
        assert!(matches!(err, DedupError::Config(_)));
    }

    #[test]
    fn nested_cache_path_is_rejected() {
        let err = DedupConfig::from_json(r#"{"cache_file_name": "sub/cache.csv"}"#).unwrap_err();
        assert!(matches!(err, DedupError::Config(_)));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = DedupConfig::load(&tmp.path().join("absent.json")).unwrap();
        assert_eq!(config, DedupConfig::default());
    }
}
