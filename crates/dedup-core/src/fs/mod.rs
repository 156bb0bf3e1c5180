/// Filesystem collaborator.
///
/// The scanner, hasher and session only talk to the archive through the
/// [`FileSystem`] trait: walk, positioned read and remove. [`RealFs`] backs it
/// with the host filesystem; [`MemFs`] is an in-memory archive for tests and
/// simulations.
pub mod mem;
pub mod real;

pub use mem::MemFs;
pub use real::RealFs;

use crate::error::Result;
use crate::model::NodeId;
use chrono::{DateTime, Utc};
use std::path::Path;

/// One regular file reported by a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    /// Segments relative to the archive root, NFC-normalised.
    pub path: Vec<String>,
    pub size: u64,
    /// Second precision, UTC.
    pub modified: DateTime<Utc>,
    pub identity: NodeId,
}

pub trait FileSystem: Send + Sync {
    /// Archive root, used for display and as the cache location.
    fn root(&self) -> &Path;

    /// Every regular file under the root, in a stable order.
    ///
    /// Unreadable entries are reported in place as errors; the walk itself
    /// never aborts.
    fn walk(&self) -> Vec<Result<WalkEntry>>;

    /// Read up to `len` bytes starting at `offset`. Fewer bytes are
    /// returned at end of file.
    fn read(&self, path: &str, offset: u64, len: u64) -> Result<Vec<u8>>;

    /// Delete one file.
    fn remove(&self, path: &str) -> Result<()>;
}
