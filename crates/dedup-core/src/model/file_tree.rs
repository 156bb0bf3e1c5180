/// Arena-backed folder tree with O(n) bottom-up aggregation.
///
/// All nodes live in a single `Vec<Option<FileNode>>`. Removed nodes leave a
/// `None` tombstone so every [`NodeIndex`] handed out stays valid (it simply
/// stops resolving). A folder is always allocated before any of its children,
/// which lets aggregation run as one reverse pass with no recursion.
use super::file_node::{FileNode, NodeIndex, NodeKind};
use super::record::{join_path, FileRecord};
use compact_str::CompactString;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct FolderTree {
    nodes: Vec<Option<FileNode>>,
    root: NodeIndex,
    live: usize,
    /// Set by every leaf mutation, cleared by [`Self::recompute_aggregates`].
    dirty: bool,
}

impl FolderTree {
    /// Create a tree holding only the root folder.
    pub fn new(root_name: &str) -> Self {
        Self {
            nodes: vec![Some(FileNode::new_folder(CompactString::new(root_name), None))],
            root: NodeIndex(0),
            live: 1,
            dirty: false,
        }
    }

    #[inline]
    pub fn root(&self) -> NodeIndex {
        self.root
    }

    /// Get a live node. Returns `None` for removed or out-of-range indices.
    #[inline]
    pub fn node(&self, index: NodeIndex) -> Option<&FileNode> {
        self.nodes.get(index.idx()).and_then(Option::as_ref)
    }

    #[inline]
    pub fn contains(&self, index: NodeIndex) -> bool {
        self.node(index).is_some()
    }

    fn node_mut(&mut self, index: NodeIndex) -> Option<&mut FileNode> {
        self.nodes.get_mut(index.idx()).and_then(Option::as_mut)
    }

    /// Number of live nodes, root included.
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    /// `true` when only the root folder is left.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live <= 1
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Direct children of a folder in insertion order; empty for leaves.
    pub fn children(&self, folder: NodeIndex) -> &[NodeIndex] {
        self.node(folder)
            .and_then(FileNode::folder)
            .map(|info| info.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn child(&self, folder: NodeIndex, name: &str) -> Option<NodeIndex> {
        self.node(folder)?.folder()?.by_name.get(name).copied()
    }

    /// Resolve a path relative to the root. The empty path is the root.
    pub fn find<S: AsRef<str>>(&self, path: &[S]) -> Option<NodeIndex> {
        let mut current = self.root;
        for segment in path {
            current = self.child(current, segment.as_ref())?;
        }
        Some(current)
    }

    /// Path segments from the root (exclusive) down to `index` (inclusive).
    pub fn path_segments(&self, index: NodeIndex) -> Vec<String> {
        let mut segments = Vec::new();
        let mut current = Some(index);
        while let Some(idx) = current {
            let Some(node) = self.node(idx) else { break };
            if node.parent.is_none() {
                break;
            }
            segments.push(node.name.to_string());
            current = node.parent;
        }
        segments.reverse();
        segments
    }

    /// Path relative to the root joined with `/`.
    pub fn full_path(&self, index: NodeIndex) -> String {
        join_path(&self.path_segments(index))
    }

    /// Folders from the root down to `index` (inclusive).
    pub fn ancestry(&self, index: NodeIndex) -> Vec<NodeIndex> {
        let mut chain = Vec::new();
        let mut current = Some(index);
        while let Some(idx) = current {
            let Some(node) = self.node(idx) else { break };
            chain.push(idx);
            current = node.parent;
        }
        chain.reverse();
        chain
    }

    /// All live leaves in arena order.
    pub fn leaves(&self) -> impl Iterator<Item = (NodeIndex, &FileNode)> {
        self.nodes.iter().enumerate().filter_map(|(i, slot)| {
            slot.as_ref()
                .filter(|node| !node.is_folder())
                .map(|node| (NodeIndex::new(i), node))
        })
    }

    fn add_node(&mut self, node: FileNode) -> NodeIndex {
        let idx = NodeIndex::new(self.nodes.len());
        self.nodes.push(Some(node));
        self.live += 1;
        idx
    }

    fn attach(&mut self, parent: NodeIndex, name: CompactString, child: NodeIndex) {
        if let Some(NodeKind::Folder(info)) = self.node_mut(parent).map(|n| &mut n.kind) {
            info.children.push(child);
            info.by_name.insert(name, child);
        }
    }

    /// Return the child folder `name` of `parent`, creating it if needed.
    ///
    /// Returns `None` when a leaf already occupies that name.
    fn folder_child(&mut self, parent: NodeIndex, name: &str) -> Option<NodeIndex> {
        if let Some(existing) = self.child(parent, name) {
            return self
                .node(existing)
                .filter(|node| node.is_folder())
                .map(|_| existing);
        }
        let name = CompactString::new(name);
        let idx = self.add_node(FileNode::new_folder(name.clone(), Some(parent)));
        self.attach(parent, name, idx);
        Some(idx)
    }

    /// Insert or update the leaf at `record.path`, creating intermediate
    /// folders on the way. Replaying the same record is a no-op apart from
    /// marking the tree dirty.
    pub fn upsert(&mut self, record: &FileRecord) -> Option<NodeIndex> {
        let Some((file_name, folders)) = record.path.split_last() else {
            warn!("Ignoring record with an empty path");
            return None;
        };

        let mut parent = self.root;
        for segment in folders {
            match self.folder_child(parent, segment) {
                Some(idx) => parent = idx,
                None => {
                    warn!(
                        "Cannot insert {}: {segment} is a file, not a folder",
                        record.path_string()
                    );
                    return None;
                }
            }
        }

        self.dirty = true;
        if let Some(existing) = self.child(parent, file_name) {
            let node = self.node_mut(existing)?;
            let NodeKind::Leaf(leaf) = &mut node.kind else {
                warn!(
                    "Cannot insert {}: a folder with that name exists",
                    record.path_string()
                );
                return None;
            };
            leaf.identity = record.identity;
            leaf.hash.clone_from(&record.hash);
            node.size = record.size;
            node.modified = Some(record.modified);
            return Some(existing);
        }

        let name = CompactString::new(file_name);
        let idx = self.add_node(FileNode::new_leaf(
            name.clone(),
            parent,
            record.identity,
            record.size,
            record.modified,
            record.hash.clone(),
        ));
        self.attach(parent, name, idx);
        Some(idx)
    }

    /// Record the fingerprint of a leaf. Returns `false` for folders and
    /// removed nodes.
    pub fn set_hash(&mut self, index: NodeIndex, hash: &str) -> bool {
        let Some(NodeKind::Leaf(leaf)) = self.node_mut(index).map(|n| &mut n.kind) else {
            return false;
        };
        leaf.hash = hash.to_string();
        self.dirty = true;
        true
    }

    /// Set the duplicate group size of a leaf.
    pub(crate) fn set_duplicates(&mut self, index: NodeIndex, duplicates: u64) {
        if let Some(NodeKind::Leaf(leaf)) = self.node_mut(index).map(|n| &mut n.kind) {
            if leaf.duplicates != duplicates {
                leaf.duplicates = duplicates;
                self.dirty = true;
            }
        }
    }

    /// Remove a leaf and every ancestor folder left without children.
    ///
    /// The root folder is never removed. Returns the removed indices, leaf
    /// first. Folders cannot be removed directly.
    pub fn remove(&mut self, index: NodeIndex) -> Vec<NodeIndex> {
        let mut removed = Vec::new();
        match self.node(index) {
            Some(node) if !node.is_folder() => {}
            _ => return removed,
        }

        let mut current = index;
        loop {
            let Some(node) = self.nodes.get_mut(current.idx()).and_then(Option::take) else {
                break;
            };
            self.live -= 1;
            removed.push(current);

            let Some(parent) = node.parent else { break };
            let parent_now_empty = match self.node_mut(parent).map(|n| &mut n.kind) {
                Some(NodeKind::Folder(info)) => {
                    info.children.retain(|&child| child != current);
                    info.by_name.remove(&node.name);
                    info.children.is_empty()
                }
                _ => false,
            };
            if !parent_now_empty || parent == self.root {
                break;
            }
            current = parent;
        }

        self.dirty = true;
        removed
    }

    /// Resolve the dirty flag, recomputing aggregates only if needed.
    pub fn ensure_aggregates(&mut self) {
        if self.dirty {
            self.recompute_aggregates();
        }
    }

    /// Recompute every folder's size, latest modification and counters from
    /// its descendants in a single bottom-up pass.
    ///
    /// Because children are always allocated after their parent, iterating
    /// in reverse guarantees every child is complete before it is added to
    /// its parent.
    pub fn recompute_aggregates(&mut self) {
        for node in self.nodes.iter_mut().flatten() {
            if let NodeKind::Folder(info) = &mut node.kind {
                node.size = 0;
                node.modified = None;
                info.leaf_count = 0;
                info.hashed_count = 0;
                info.duplicate_count = 0;
            }
        }

        for i in (0..self.nodes.len()).rev() {
            let Some(node) = self.nodes[i].as_ref() else {
                continue;
            };
            let Some(parent) = node.parent else { continue };
            let size = node.size;
            let modified = node.modified;
            let (leaves, hashed, duplicates) = match &node.kind {
                NodeKind::Folder(info) => (info.leaf_count, info.hashed_count, info.duplicate_count),
                NodeKind::Leaf(leaf) => (
                    1,
                    u64::from(!leaf.hash.is_empty()),
                    u64::from(leaf.duplicates > 0),
                ),
            };

            if let Some(parent_node) = self.node_mut(parent) {
                parent_node.size += size;
                parent_node.modified = parent_node.modified.max(modified);
                if let NodeKind::Folder(info) = &mut parent_node.kind {
                    info.leaf_count += leaves;
                    info.hashed_count += hashed;
                    info.duplicate_count += duplicates;
                }
            }
        }

        self.dirty = false;
    }
}
