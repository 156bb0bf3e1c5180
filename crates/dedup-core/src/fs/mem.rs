/// In-memory archive for tests and simulated sessions.
///
/// Files are keyed by their `/`-joined relative path and walked in sorted
/// order. Each file gets a fresh [`NodeId`] when added; renaming keeps it,
/// exactly like an inode. Reads are counted so tests can prove that cached
/// files were never re-hashed, and individual files can be made unreadable
/// or undeletable to exercise error paths.
use super::{FileSystem, WalkEntry};
use crate::error::{DedupError, Result};
use crate::model::record::{join_path, parse_path, round_to_seconds};
use crate::model::NodeId;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

#[derive(Debug, Clone)]
struct MemFile {
    data: Vec<u8>,
    modified: DateTime<Utc>,
    identity: NodeId,
}

pub struct MemFs {
    root: PathBuf,
    files: Mutex<BTreeMap<String, MemFile>>,
    unreadable: Mutex<HashSet<String>>,
    undeletable: Mutex<HashSet<String>>,
    next_identity: AtomicU64,
    reads: AtomicUsize,
}

impl MemFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files: Mutex::new(BTreeMap::new()),
            unreadable: Mutex::new(HashSet::new()),
            undeletable: Mutex::new(HashSet::new()),
            next_identity: AtomicU64::new(1),
            reads: AtomicUsize::new(0),
        }
    }

    fn key(path: &str) -> String {
        join_path(&parse_path(path))
    }

    /// Add or replace a file. Replacing keeps the existing identity.
    pub fn add_file(&self, path: &str, data: &[u8], modified: DateTime<Utc>) -> NodeId {
        let mut files = self.files.lock();
        let key = Self::key(path);
        let identity = files
            .get(&key)
            .map(|file| file.identity)
            .unwrap_or_else(|| NodeId(self.next_identity.fetch_add(1, Ordering::Relaxed)));
        files.insert(
            key,
            MemFile {
                data: data.to_vec(),
                modified: round_to_seconds(modified),
                identity,
            },
        );
        identity
    }

    /// Change a file's modification time.
    pub fn touch(&self, path: &str, modified: DateTime<Utc>) -> Result<()> {
        let mut files = self.files.lock();
        let file = files
            .get_mut(&Self::key(path))
            .ok_or_else(|| DedupError::NotFound(path.to_string()))?;
        file.modified = round_to_seconds(modified);
        Ok(())
    }

    /// Move a file, keeping its identity.
    pub fn rename(&self, from: &str, to: &str) -> Result<()> {
        let mut files = self.files.lock();
        let file = files
            .remove(&Self::key(from))
            .ok_or_else(|| DedupError::NotFound(from.to_string()))?;
        files.insert(Self::key(to), file);
        Ok(())
    }

    pub fn make_unreadable(&self, path: &str) {
        self.unreadable.lock().insert(Self::key(path));
    }

    pub fn make_undeletable(&self, path: &str) {
        self.undeletable.lock().insert(Self::key(path));
    }

    pub fn exists(&self, path: &str) -> bool {
        self.files.lock().contains_key(&Self::key(path))
    }

    pub fn identity(&self, path: &str) -> Option<NodeId> {
        self.files.lock().get(&Self::key(path)).map(|file| file.identity)
    }

    /// Number of successful `read` calls so far.
    pub fn read_calls(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }
}

impl FileSystem for MemFs {
    fn root(&self) -> &Path {
        &self.root
    }

    fn walk(&self) -> Vec<Result<WalkEntry>> {
        self.files
            .lock()
            .iter()
            .map(|(path, file)| {
                Ok(WalkEntry {
                    path: parse_path(path),
                    size: file.data.len() as u64,
                    modified: file.modified,
                    identity: file.identity,
                })
            })
            .collect()
    }

    fn read(&self, path: &str, offset: u64, len: u64) -> Result<Vec<u8>> {
        let key = Self::key(path);
        if self.unreadable.lock().contains(&key) {
            return Err(DedupError::io(
                self.root.join(&key),
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "unreadable"),
            ));
        }
        let files = self.files.lock();
        let file = files
            .get(&key)
            .ok_or_else(|| DedupError::NotFound(path.to_string()))?;
        self.reads.fetch_add(1, Ordering::Relaxed);

        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(file.data.len());
        let end = start
            .saturating_add(usize::try_from(len).unwrap_or(usize::MAX))
            .min(file.data.len());
        Ok(file.data[start..end].to_vec())
    }

    fn remove(&self, path: &str) -> Result<()> {
        let key = Self::key(path);
        if self.undeletable.lock().contains(&key) {
            return Err(DedupError::io(
                self.root.join(&key),
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only file"),
            ));
        }
        self.files
            .lock()
            .remove(&key)
            .map(|_| ())
            .ok_or_else(|| DedupError::NotFound(path.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn walk_is_sorted_by_path() {
        let fs = MemFs::new("/sim");
        fs.add_file("b/two.txt", b"22", at(2));
        fs.add_file("a.txt", b"1", at(1));
        let paths: Vec<String> = fs
            .walk()
            .into_iter()
            .map(|entry| join_path(&entry.unwrap().path))
            .collect();
        assert_eq!(paths, vec!["a.txt", "b/two.txt"]);
    }

    #[test]
    fn rename_keeps_identity() {
        let fs = MemFs::new("/sim");
        let id = fs.add_file("old.txt", b"data", at(1));
        fs.rename("old.txt", "new/place.txt").unwrap();
        assert_eq!(fs.identity("new/place.txt"), Some(id));
        assert!(!fs.exists("old.txt"));
    }

    #[test]
    fn read_clamps_to_file_end_and_counts_calls() {
        let fs = MemFs::new("/sim");
        fs.add_file("f", b"abcdef", at(1));
        assert_eq!(fs.read("f", 4, 10).unwrap(), b"ef");
        assert_eq!(fs.read("f", 10, 10).unwrap(), b"");
        assert_eq!(fs.read_calls(), 2);
    }

    #[test]
    fn failure_switches_are_honoured() {
        let fs = MemFs::new("/sim");
        fs.add_file("locked", b"x", at(1));
        fs.make_unreadable("locked");
        fs.make_undeletable("locked");
        assert!(fs.read("locked", 0, 1).is_err());
        assert!(fs.remove("locked").is_err());
        assert!(fs.exists("locked"));
        assert_eq!(fs.read_calls(), 0);
    }
}
