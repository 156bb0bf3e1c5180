/// File metadata as discovered by the scanner.
use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;
use std::time::SystemTime;
use unicode_normalization::UnicodeNormalization;

/// Stable filesystem identity of a file (the inode on Unix).
///
/// Used as the cache key so that a renamed or moved file keeps its
/// previously computed fingerprint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub u64);

/// One regular file of the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    /// Path segments relative to the archive root, NFC-normalised.
    pub path: Vec<String>,
    pub identity: NodeId,
    pub size: u64,
    /// Last modification, rounded to whole seconds.
    pub modified: DateTime<Utc>,
    /// Fingerprint; empty while unknown.
    pub hash: String,
}

impl FileRecord {
    /// Path joined with `/`, the form used in events and the cache file.
    pub fn path_string(&self) -> String {
        join_path(&self.path)
    }

    pub fn is_hashed(&self) -> bool {
        !self.hash.is_empty()
    }
}

/// Split a `/`-separated relative path into segments, keeping each name
/// exactly as stored.
///
/// Empty segments (leading, trailing or doubled slashes) are dropped.
pub fn parse_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn join_path<S: AsRef<str>>(segments: &[S]) -> String {
    let mut joined = String::new();
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            joined.push('/');
        }
        joined.push_str(segment.as_ref());
    }
    joined
}

/// Canonical Unicode form (NFC) used for paths persisted in the cache.
/// Names in the tree and in filesystem calls are never normalised.
pub fn normalize(name: &str) -> String {
    name.nfc().collect()
}

/// Second-precision UTC timestamp, the resolution the cache stores.
pub fn to_utc_seconds(time: SystemTime) -> DateTime<Utc> {
    round_to_seconds(DateTime::<Utc>::from(time))
}

/// Round to the nearest whole second, half a second rounding up.
pub fn round_to_seconds(time: DateTime<Utc>) -> DateTime<Utc> {
    time.round_subsecs(0)
}
