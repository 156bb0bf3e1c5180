/// Host filesystem backed by a `jwalk` parallel directory walk.
use super::{FileSystem, WalkEntry};
use crate::error::{DedupError, Result};
use crate::model::record::to_utc_seconds;
use crate::model::NodeId;
use std::fs::{File, Metadata};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Component, Path, PathBuf};
use tracing::info;

pub struct RealFs {
    root: PathBuf,
    reserved_prefix: String,
}

impl RealFs {
    /// `root` should be absolute; see [`RealFs::open`].
    pub fn new(root: PathBuf, reserved_prefix: impl Into<String>) -> Self {
        Self {
            root,
            reserved_prefix: reserved_prefix.into(),
        }
    }

    /// Resolve `path` to an absolute, existing directory and wrap it.
    pub fn open(path: &Path, reserved_prefix: impl Into<String>) -> Result<Self> {
        let root = std::fs::canonicalize(path).map_err(|e| DedupError::io(path, e))?;
        let meta = std::fs::metadata(&root).map_err(|e| DedupError::io(&root, e))?;
        if !meta.is_dir() {
            return Err(DedupError::NotFound(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        Ok(Self::new(root, reserved_prefix))
    }

    fn absolute(&self, path: &str) -> PathBuf {
        let mut abs = self.root.clone();
        abs.extend(path.split('/').filter(|s| !s.is_empty()));
        abs
    }
}

impl FileSystem for RealFs {
    fn root(&self) -> &Path {
        &self.root
    }

    fn walk(&self) -> Vec<Result<WalkEntry>> {
        let prefix = self.reserved_prefix.clone();
        // Hidden entries are skipped by jwalk itself; reserved folders are
        // pruned before descending so their subtrees are never read.
        let walker = jwalk::WalkDir::new(&self.root)
            .skip_hidden(true)
            .follow_links(false)
            .sort(true)
            .parallelism(jwalk::Parallelism::RayonNewPool(num_cpus::get()))
            .process_read_dir(move |_depth, _path, _state, children| {
                children.retain(|child| match child {
                    Ok(entry) => {
                        !(entry.file_type().is_dir()
                            && !prefix.is_empty()
                            && entry.file_name().to_string_lossy().starts_with(prefix.as_str()))
                    }
                    Err(_) => true,
                });
            });

        let mut entries = Vec::new();
        for entry_result in walker {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(err) => {
                    entries.push(Err(DedupError::Walk(err.to_string())));
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let meta = match entry.metadata() {
                Ok(meta) => meta,
                Err(err) => {
                    entries.push(Err(DedupError::Walk(format!("{}: {err}", path.display()))));
                    continue;
                }
            };
            let modified = match meta.modified() {
                Ok(time) => to_utc_seconds(time),
                Err(err) => {
                    entries.push(Err(DedupError::io(&path, err)));
                    continue;
                }
            };
            let Some(segments) = relative_segments(&self.root, &path) else {
                continue;
            };

            entries.push(Ok(WalkEntry {
                path: segments,
                size: meta.len(),
                modified,
                identity: node_identity(&meta, &path),
            }));
        }
        entries
    }

    fn read(&self, path: &str, offset: u64, len: u64) -> Result<Vec<u8>> {
        let abs = self.absolute(path);
        let mut file = File::open(&abs).map_err(|e| DedupError::io(&abs, e))?;
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| DedupError::io(&abs, e))?;
        let mut buf = Vec::with_capacity(len.min(16 * 1024 * 1024) as usize);
        file.take(len)
            .read_to_end(&mut buf)
            .map_err(|e| DedupError::io(&abs, e))?;
        Ok(buf)
    }

    fn remove(&self, path: &str) -> Result<()> {
        let abs = self.absolute(path);
        std::fs::remove_file(&abs).map_err(|e| DedupError::io(&abs, e))?;
        info!("Removed {}", abs.display());
        Ok(())
    }
}

fn relative_segments(root: &Path, path: &Path) -> Option<Vec<String>> {
    let relative = path.strip_prefix(root).ok()?;
    let segments: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    (!segments.is_empty()).then_some(segments)
}

/// Stable identity of a file across renames: the inode number.
#[cfg(unix)]
fn node_identity(meta: &Metadata, _path: &Path) -> NodeId {
    use std::os::unix::fs::MetadataExt;
    NodeId(meta.ino())
}

/// Without inode numbers the path is the best identity available, so a
/// rename costs one re-hash.
#[cfg(not(unix))]
fn node_identity(_meta: &Metadata, path: &Path) -> NodeId {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    path.hash(&mut hasher);
    NodeId(hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Archive roots must not look hidden themselves.
    fn archive_dir() -> tempfile::TempDir {
        tempfile::Builder::new().prefix("archive").tempdir().unwrap()
    }

    #[test]
    fn walk_skips_hidden_and_reserved_entries() {
        let tmp = archive_dir();
        fs::create_dir_all(tmp.path().join("keep/inner")).unwrap();
        fs::create_dir_all(tmp.path().join("~~~trash")).unwrap();
        fs::create_dir_all(tmp.path().join(".git")).unwrap();
        fs::write(tmp.path().join("keep/inner/a.txt"), b"hello").unwrap();
        fs::write(tmp.path().join("~~~trash/b.txt"), b"hello").unwrap();
        fs::write(tmp.path().join(".git/c.txt"), b"hello").unwrap();
        fs::write(tmp.path().join(".hidden"), b"hello").unwrap();

        let real = RealFs::open(tmp.path(), "~~~").unwrap();
        let paths: Vec<Vec<String>> = real
            .walk()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path)
            .collect();
        assert_eq!(paths, vec![vec!["keep", "inner", "a.txt"]]);
    }

    #[test]
    fn read_returns_requested_window() {
        let tmp = archive_dir();
        fs::write(tmp.path().join("data.bin"), b"0123456789").unwrap();
        let real = RealFs::open(tmp.path(), "~~~").unwrap();

        assert_eq!(real.read("data.bin", 2, 3).unwrap(), b"234");
        assert_eq!(real.read("data.bin", 8, 100).unwrap(), b"89");
        assert!(real.read("missing.bin", 0, 1).is_err());
    }

    #[test]
    fn remove_deletes_file() {
        let tmp = archive_dir();
        fs::create_dir(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("sub/x.txt"), b"x").unwrap();
        let real = RealFs::open(tmp.path(), "~~~").unwrap();

        real.remove("sub/x.txt").unwrap();
        assert!(!tmp.path().join("sub/x.txt").exists());
        assert!(real.remove("sub/x.txt").is_err());
    }

    #[test]
    fn decomposed_names_can_be_read_and_removed() {
        let tmp = archive_dir();
        let name = "cafe\u{0301}.txt";
        fs::write(tmp.path().join(name), b"latte").unwrap();
        let real = RealFs::open(tmp.path(), "~~~").unwrap();

        let entries: Vec<WalkEntry> = real.walk().into_iter().map(|e| e.unwrap()).collect();
        assert_eq!(entries.len(), 1);
        let path = entries[0].path.join("/");
        assert_eq!(real.read(&path, 0, 16).unwrap(), b"latte");
        real.remove(&path).unwrap();
        assert!(real.walk().is_empty());
    }

    #[test]
    fn open_rejects_files() {
        let tmp = archive_dir();
        fs::write(tmp.path().join("f"), b"x").unwrap();
        assert!(RealFs::open(&tmp.path().join("f"), "~~~").is_err());
        assert!(RealFs::open(&tmp.path().join("nope"), "~~~").is_err());
    }
}
