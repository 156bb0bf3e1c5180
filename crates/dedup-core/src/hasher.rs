/// Content fingerprints.
///
/// Under [`HashPolicy::Fast`] only a head window and, for files larger than
/// twice the window, a tail window are read, so hashing cost is bounded no
/// matter how large the file is. Files up to twice the window are still
/// hashed in full. Combined with the size check in the cache this is a speed
/// trade-off, not an equality proof: two files with identical windows and
/// size share a fingerprint. [`HashPolicy::Exact`] reads everything.
use crate::config::{HashPolicy, DEFAULT_HASH_WINDOW};
use crate::error::Result;
use crate::fs::FileSystem;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use sha2::{Digest, Sha256};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentHasher {
    policy: HashPolicy,
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new(HashPolicy::default())
    }
}

impl ContentHasher {
    pub fn new(policy: HashPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> HashPolicy {
        self.policy
    }

    /// Fingerprint of `path`, or an empty string if the file could not be
    /// read. An empty fingerprint means "not hashed" everywhere downstream.
    pub fn fingerprint(&self, fs: &dyn FileSystem, path: &str, size: u64) -> String {
        match self.try_fingerprint(fs, path, size) {
            Ok(hash) => hash,
            Err(err) => {
                warn!("Failed to hash {path}: {err}");
                String::new()
            }
        }
    }

    pub fn try_fingerprint(&self, fs: &dyn FileSystem, path: &str, size: u64) -> Result<String> {
        let mut hasher = Sha256::new();
        match self.policy {
            HashPolicy::Fast { window } => {
                let window = if window == 0 { DEFAULT_HASH_WINDOW } else { window };
                hasher.update(fs.read(path, 0, window)?);
                if size > window {
                    let offset = if size > 2 * window { size - window } else { window };
                    hasher.update(fs.read(path, offset, window)?);
                }
            }
            HashPolicy::Exact => {
                let mut offset = 0;
                loop {
                    let chunk = fs.read(path, offset, DEFAULT_HASH_WINDOW)?;
                    if chunk.is_empty() {
                        break;
                    }
                    offset += chunk.len() as u64;
                    hasher.update(&chunk);
                }
            }
        }
        Ok(URL_SAFE_NO_PAD.encode(hasher.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemFs;
    use chrono::{TimeZone, Utc};

    const WINDOW: u64 = 8;

    fn fast() -> ContentHasher {
        ContentHasher::new(HashPolicy::Fast { window: WINDOW })
    }

    fn memfs(files: &[(&str, &[u8])]) -> MemFs {
        let fs = MemFs::new("/sim");
        for (path, data) in files {
            fs.add_file(path, data, Utc.timestamp_opt(1, 0).unwrap());
        }
        fs
    }

    #[test]
    fn identical_content_gives_identical_hash() {
        let fs = memfs(&[("a", b"AAAAAAAAAA"), ("b", b"AAAAAAAAAA"), ("c", b"BBBBBBBBBB")]);
        let a = fast().fingerprint(&fs, "a", 10);
        assert_eq!(a, fast().fingerprint(&fs, "a", 10));
        assert_eq!(a, fast().fingerprint(&fs, "b", 10));
        assert_ne!(a, fast().fingerprint(&fs, "c", 10));
    }

    #[test]
    fn hash_is_compact_printable_token() {
        let fs = memfs(&[("a", b"xyz")]);
        let hash = fast().fingerprint(&fs, "a", 3);
        assert_eq!(hash.len(), 43);
        assert!(hash
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn small_and_medium_files_are_hashed_in_full() {
        // 12 bytes: head window plus the remainder, nothing skipped.
        let fs = memfs(&[("a", b"0123456789ab"), ("b", b"0123456789ac")]);
        assert_ne!(
            fast().fingerprint(&fs, "a", 12),
            fast().fingerprint(&fs, "b", 12)
        );
    }

    #[test]
    fn large_files_differing_only_in_the_middle_collide_under_fast() {
        let a = b"HEADHEAD--middle-one--TAILTAIL";
        let b = b"HEADHEAD--middle-two--TAILTAIL";
        let fs = memfs(&[("a", a), ("b", b)]);
        let size = a.len() as u64;
        assert_eq!(
            fast().fingerprint(&fs, "a", size),
            fast().fingerprint(&fs, "b", size)
        );

        let exact = ContentHasher::new(HashPolicy::Exact);
        assert_ne!(
            exact.fingerprint(&fs, "a", size),
            exact.fingerprint(&fs, "b", size)
        );
    }

    #[test]
    fn large_files_read_exactly_two_windows() {
        let data = vec![7u8; 100];
        let fs = memfs(&[("big", &data)]);
        fast().fingerprint(&fs, "big", 100);
        assert_eq!(fs.read_calls(), 2);
    }

    #[test]
    fn unreadable_file_yields_empty_hash() {
        let fs = memfs(&[("locked", b"data")]);
        fs.make_unreadable("locked");
        assert_eq!(fast().fingerprint(&fs, "locked", 4), "");
        assert_eq!(fast().fingerprint(&fs, "missing", 4), "");
    }
}
