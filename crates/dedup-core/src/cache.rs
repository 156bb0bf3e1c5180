/// Persistent fingerprint cache, stored as CSV at the archive root.
///
/// Entries are keyed by [`NodeId`] so a moved or renamed file keeps its
/// fingerprint. An entry is only trusted while the live file still has the
/// stored size and modification time.
///
/// The cache is strictly best effort: a missing, corrupt or unwritable file
/// never stops a scan, it only costs re-hashing.
use crate::error::{DedupError, Result};
use crate::model::record::{normalize, round_to_seconds, FileRecord};
use crate::model::NodeId;
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const HEADER: [&str; 5] = ["INode", "Name", "Size", "ModTime", "Hash"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub identity: NodeId,
    /// `/`-joined relative path, NFC-normalised.
    pub path: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub hash: String,
}

impl CacheEntry {
    pub fn from_record(record: &FileRecord) -> Self {
        Self {
            identity: record.identity,
            path: record.path_string(),
            size: record.size,
            modified: record.modified,
            hash: record.hash.clone(),
        }
    }

    /// `true` if this entry still describes a file with the given size and
    /// modification time, i.e. its hash can be reused.
    pub fn is_valid_for(&self, size: u64, modified: DateTime<Utc>) -> bool {
        !self.hash.is_empty() && self.size == size && self.modified == modified
    }
}

pub type CacheMap = HashMap<NodeId, CacheEntry>;

/// Location of the cache file for one archive.
#[derive(Debug, Clone)]
pub struct MetadataCache {
    path: PathBuf,
}

impl MetadataCache {
    pub fn for_root(root: &Path, file_name: &str) -> Self {
        Self {
            path: root.join(file_name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every usable entry. Never fails: problems yield fewer entries.
    pub fn load(&self) -> CacheMap {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) => {
                debug!("No cache at {}: {err}", self.path.display());
                return CacheMap::new();
            }
        };
        let entries = parse_records(BufReader::new(file));
        info!(
            "Loaded {} cached fingerprints from {}",
            entries.len(),
            self.path.display()
        );
        entries
    }

    /// Overwrite the cache with the hashed entries. Failures are logged and
    /// otherwise ignored: the scan they belong to has already succeeded.
    pub fn save<'a>(&self, entries: impl IntoIterator<Item = &'a CacheEntry>) {
        let result = File::create(&self.path)
            .map_err(|e| DedupError::io(&self.path, e))
            .and_then(|file| {
                let mut writer = BufWriter::new(file);
                let written = write_records(&mut writer, entries)?;
                writer
                    .flush()
                    .map_err(|e| DedupError::io(&self.path, e))?;
                Ok(written)
            });
        match result {
            Ok(written) => info!("Saved {written} fingerprints to {}", self.path.display()),
            Err(err) => warn!("Failed to save cache {}: {err}", self.path.display()),
        }
    }
}

/// Parse cache rows, skipping anything short, unparsable or unhashed.
pub fn parse_records<R: Read>(reader: R) -> CacheMap {
    let mut entries = CacheMap::new();
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    for (row, record) in csv_reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                debug!("Skipping cache row {row}: {err}");
                continue;
            }
        };
        match parse_row(&record) {
            Some(entry) => {
                entries.insert(entry.identity, entry);
            }
            None => debug!("Skipping malformed cache row {row}"),
        }
    }
    entries
}

fn parse_row(record: &csv::StringRecord) -> Option<CacheEntry> {
    if record.len() < HEADER.len() {
        return None;
    }
    let identity = record.get(0)?.trim().parse().ok()?;
    let path = normalize(record.get(1)?);
    let size = record.get(2)?.trim().parse().ok()?;
    let modified = DateTime::parse_from_rfc3339(record.get(3)?.trim())
        .ok()?
        .with_timezone(&Utc);
    let modified = round_to_seconds(modified);
    let hash = record.get(4)?.trim();
    if hash.is_empty() {
        return None;
    }
    Some(CacheEntry {
        identity: NodeId(identity),
        path,
        size,
        modified,
        hash: hash.to_string(),
    })
}

/// Write a header and one row per hashed entry, sorted by path then identity.
/// Returns the number of rows written.
pub fn write_records<'a, W: Write>(
    writer: W,
    entries: impl IntoIterator<Item = &'a CacheEntry>,
) -> Result<usize> {
    let mut rows: Vec<&CacheEntry> = entries
        .into_iter()
        .filter(|entry| !entry.hash.is_empty())
        .collect();
    rows.sort_by(|a, b| a.path.cmp(&b.path).then(a.identity.cmp(&b.identity)));

    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(HEADER)?;
    for entry in &rows {
        csv_writer.write_record([
            entry.identity.0.to_string(),
            normalize(&entry.path),
            entry.size.to_string(),
            entry.modified.to_rfc3339_opts(SecondsFormat::Secs, true),
            entry.hash.clone(),
        ])?;
    }
    csv_writer.flush().map_err(csv::Error::from)?;
    Ok(rows.len())
}
