/// A single node in the arena-allocated folder tree.
///
/// Nodes are stored in a flat `Vec` and refer to each other through
/// [`NodeIndex`] values instead of pointers, so the parent back-reference
/// used for path reconstruction and pruning never forms an ownership cycle.
use chrono::{DateTime, Utc};
use compact_str::CompactString;
use std::collections::HashMap;

use super::record::NodeId;

/// Lightweight index into the arena.
///
/// Uses `u32` to keep nodes small; supports up to ~4 billion nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(pub u32);

impl NodeIndex {
    #[inline]
    pub fn new(index: usize) -> Self {
        debug_assert!(index <= u32::MAX as usize, "NodeIndex overflow");
        Self(index as u32)
    }

    #[inline]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

/// A file or folder in the tree.
#[derive(Debug, Clone)]
pub struct FileNode {
    /// Name only (NOT the full path). Full paths are rebuilt by walking
    /// up through `parent`.
    pub name: CompactString,

    /// `None` only for the archive root.
    pub parent: Option<NodeIndex>,

    /// File size, or for folders the sum over all descendant leaves.
    pub size: u64,

    /// Modification time, or for folders the latest descendant time.
    pub modified: Option<DateTime<Utc>>,

    pub kind: NodeKind,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Folder(FolderInfo),
    Leaf(LeafInfo),
}

/// Children and rolled-up counters of a folder.
#[derive(Debug, Clone, Default)]
pub struct FolderInfo {
    /// Children in insertion order. Display order is decided by
    /// the navigation layer.
    pub children: Vec<NodeIndex>,
    /// Name lookup; names are unique within a folder.
    pub by_name: HashMap<CompactString, NodeIndex>,
    pub leaf_count: u64,
    pub hashed_count: u64,
    /// Number of descendant leaves that belong to a duplicate group.
    pub duplicate_count: u64,
}

#[derive(Debug, Clone)]
pub struct LeafInfo {
    pub identity: NodeId,
    /// Fingerprint; empty while unknown.
    pub hash: String,
    /// Size of the duplicate group this leaf belongs to, 0 if none.
    pub duplicates: u64,
}

impl FileNode {
    pub fn new_folder(name: CompactString, parent: Option<NodeIndex>) -> Self {
        Self {
            name,
            parent,
            size: 0,
            modified: None,
            kind: NodeKind::Folder(FolderInfo::default()),
        }
    }

    pub fn new_leaf(
        name: CompactString,
        parent: NodeIndex,
        identity: NodeId,
        size: u64,
        modified: DateTime<Utc>,
        hash: String,
    ) -> Self {
        Self {
            name,
            parent: Some(parent),
            size,
            modified: Some(modified),
            kind: NodeKind::Leaf(LeafInfo {
                identity,
                hash,
                duplicates: 0,
            }),
        }
    }

    #[inline]
    pub fn is_folder(&self) -> bool {
        matches!(self.kind, NodeKind::Folder(_))
    }

    pub fn folder(&self) -> Option<&FolderInfo> {
        match &self.kind {
            NodeKind::Folder(info) => Some(info),
            NodeKind::Leaf(_) => None,
        }
    }

    pub fn leaf(&self) -> Option<&LeafInfo> {
        match &self.kind {
            NodeKind::Leaf(info) => Some(info),
            NodeKind::Folder(_) => None,
        }
    }

    /// The leaf's fingerprint, `None` for folders and unhashed leaves.
    pub fn hash(&self) -> Option<&str> {
        self.leaf()
            .map(|leaf| leaf.hash.as_str())
            .filter(|hash| !hash.is_empty())
    }

    /// Duplicate group size for leaves, duplicate-leaf count for folders.
    pub fn duplicates(&self) -> u64 {
        match &self.kind {
            NodeKind::Folder(info) => info.duplicate_count,
            NodeKind::Leaf(info) => info.duplicates,
        }
    }

    /// `true` if a leaf has a fingerprint or a folder has at least one
    /// hashed leaf and no unhashed ones.
    pub fn is_hashed(&self) -> bool {
        match &self.kind {
            NodeKind::Folder(info) => info.leaf_count > 0 && info.hashed_count == info.leaf_count,
            NodeKind::Leaf(info) => !info.hash.is_empty(),
        }
    }
}
