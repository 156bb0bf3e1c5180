/// Scanner: walks the archive, reuses cached fingerprints, hashes the rest
/// and reports everything as an ordered [`ScanEvent`] stream.
///
/// A scan always runs to completion; there is no cancellation. It runs on
/// its own thread (see [`start_scan`]) and only ever talks to the rest of
/// the system through its [`ScanSink`], so it never touches the tree.
pub mod filter;
pub mod progress;

pub use progress::{ScanEvent, ScanSink};

use crate::cache::{CacheEntry, MetadataCache};
use crate::config::DedupConfig;
use crate::error::{DedupError, Result};
use crate::fs::FileSystem;
use crate::hasher::ContentHasher;
use crate::model::FileRecord;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct Scanner {
    fs: Arc<dyn FileSystem>,
    cache: MetadataCache,
    hasher: ContentHasher,
    reserved_prefix: String,
}

impl Scanner {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        cache: MetadataCache,
        hasher: ContentHasher,
        reserved_prefix: impl Into<String>,
    ) -> Self {
        Self {
            fs,
            cache,
            hasher,
            reserved_prefix: reserved_prefix.into(),
        }
    }

    /// Scanner for `fs` with the cache location, hash policy and exclusions
    /// taken from `config`.
    pub fn from_config(fs: Arc<dyn FileSystem>, config: &DedupConfig) -> Self {
        let cache = MetadataCache::for_root(fs.root(), &config.cache_file_name);
        Self::new(
            fs,
            cache,
            ContentHasher::new(config.hash_policy),
            config.reserved_prefix.clone(),
        )
    }

    /// Walk and collect the records that take part in the scan, filling in
    /// every hash the cache can vouch for.
    fn discover(&self, error_count: &mut u64) -> Vec<FileRecord> {
        let cached = self.cache.load();
        let mut records = Vec::new();
        let mut reused = 0usize;

        for entry in self.fs.walk() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    *error_count += 1;
                    warn!("Skipping unreadable entry: {err}");
                    continue;
                }
            };
            if entry.size == 0 || filter::is_excluded(&entry.path, &self.reserved_prefix) {
                continue;
            }

            let hash = match cached.get(&entry.identity) {
                Some(cached) if cached.is_valid_for(entry.size, entry.modified) => {
                    reused += 1;
                    cached.hash.clone()
                }
                _ => String::new(),
            };
            records.push(FileRecord {
                path: entry.path,
                identity: entry.identity,
                size: entry.size,
                modified: entry.modified,
                hash,
            });
        }

        info!(
            "Discovered {} files, {} fingerprints reused from cache",
            records.len(),
            reused
        );
        records
    }

    /// Run a complete scan on the current thread.
    pub fn scan(&self, sink: &dyn ScanSink) {
        let start = Instant::now();
        let mut error_count = 0u64;
        info!("Starting scan of {}", self.fs.root().display());

        let mut records = self.discover(&mut error_count);
        sink.send(ScanEvent::MetadataAvailable(records.clone()));

        for record in records.iter_mut().filter(|record| !record.is_hashed()) {
            let path = record.path_string();
            debug!("Hashing {path}");
            record.hash = self.hasher.fingerprint(self.fs.as_ref(), &path, record.size);
            if !record.is_hashed() {
                error_count += 1;
            }
            sink.send(ScanEvent::Hashed {
                path: record.path.clone(),
                hash: record.hash.clone(),
            });
        }

        let entries: Vec<CacheEntry> = records.iter().map(CacheEntry::from_record).collect();
        self.cache.save(&entries);

        let duration = start.elapsed();
        info!(
            "Scan complete: {} files in {duration:?}, {error_count} errors",
            records.len()
        );
        sink.send(ScanEvent::Complete {
            duration,
            error_count,
        });
    }
}

/// Run `scanner` on a background thread. Returns immediately.
pub fn start_scan<S>(scanner: Scanner, sink: S) -> Result<thread::JoinHandle<()>>
where
    S: ScanSink + 'static,
{
    thread::Builder::new()
        .name("dedup-scanner".into())
        .spawn(move || scanner.scan(&sink))
        .map_err(DedupError::Spawn)
}
