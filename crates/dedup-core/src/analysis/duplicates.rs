/// Duplicate detection by fingerprint.
///
/// Groups are rebuilt from scratch on every pass: once when the scan
/// completes and once after every deletion batch.
use crate::model::{FolderTree, NodeIndex};
use std::collections::HashMap;
use tracing::info;

/// A set of at least two leaves sharing one fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub hash: String,
    /// Size of each file in the group.
    pub size: u64,
    /// Members ordered by full path.
    pub files: Vec<NodeIndex>,
}

impl DuplicateGroup {
    /// Bytes that would be freed by keeping a single copy.
    pub fn wasted_bytes(&self) -> u64 {
        self.size * (self.files.len() as u64).saturating_sub(1)
    }
}

/// Result of one analysis pass.
#[derive(Debug, Clone, Default)]
pub struct DuplicateReport {
    /// Groups ordered by the path of their first member.
    pub groups: Vec<DuplicateGroup>,
    by_hash: HashMap<String, usize>,
}

impl DuplicateReport {
    pub fn group_of(&self, hash: &str) -> Option<&DuplicateGroup> {
        self.by_hash.get(hash).and_then(|&i| self.groups.get(i))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn wasted_bytes(&self) -> u64 {
        self.groups.iter().map(DuplicateGroup::wasted_bytes).sum()
    }
}

/// Group every hashed leaf by fingerprint and store each leaf's group size
/// (0 for unhashed leaves and singletons).
///
/// Leaves that changed are marked, so the caller must resolve aggregates
/// before reading folder counters.
pub fn analyze(tree: &mut FolderTree) -> DuplicateReport {
    let mut by_hash: HashMap<String, Vec<NodeIndex>> = HashMap::new();
    let mut unhashed = Vec::new();
    for (idx, node) in tree.leaves() {
        match node.hash() {
            Some(hash) => by_hash.entry(hash.to_string()).or_default().push(idx),
            None => unhashed.push(idx),
        }
    }

    for idx in unhashed {
        tree.set_duplicates(idx, 0);
    }

    let mut groups = Vec::new();
    for (hash, mut files) in by_hash {
        let count = files.len() as u64;
        if count < 2 {
            for &idx in &files {
                tree.set_duplicates(idx, 0);
            }
            continue;
        }
        for &idx in &files {
            tree.set_duplicates(idx, count);
        }
        let mut keyed: Vec<(String, NodeIndex)> = files
            .drain(..)
            .map(|idx| (tree.full_path(idx), idx))
            .collect();
        keyed.sort();
        let size = tree.node(keyed[0].1).map(|node| node.size).unwrap_or(0);
        groups.push(DuplicateGroup {
            hash,
            size,
            files: keyed.into_iter().map(|(_, idx)| idx).collect(),
        });
    }

    groups.sort_by_cached_key(|group| tree.full_path(group.files[0]));
    let by_hash = groups
        .iter()
        .enumerate()
        .map(|(i, group)| (group.hash.clone(), i))
        .collect();

    let report = DuplicateReport { groups, by_hash };
    info!(
        "Duplicate analysis: {} groups, {} bytes reclaimable",
        report.len(),
        report.wasted_bytes()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::record::parse_path;
    use crate::model::{FileRecord, NodeId};
    use chrono::{TimeZone, Utc};

    fn add(tree: &mut FolderTree, path: &str, size: u64, hash: &str) -> NodeIndex {
        tree.upsert(&FileRecord {
            path: parse_path(path),
            identity: NodeId(0),
            size,
            modified: Utc.timestamp_opt(1, 0).unwrap(),
            hash: hash.to_string(),
        })
        .unwrap()
    }

    fn dups(tree: &FolderTree, idx: NodeIndex) -> u64 {
        tree.node(idx).unwrap().duplicates()
    }

    #[test]
    fn groups_of_two_or_more_are_marked_with_their_size() {
        let mut tree = FolderTree::new("archive");
        let a = add(&mut tree, "x/a", 10, "h1");
        let b = add(&mut tree, "y/b", 10, "h1");
        let c = add(&mut tree, "c", 10, "h1");
        let single = add(&mut tree, "d", 10, "h2");
        let unhashed = add(&mut tree, "e", 10, "");

        let report = analyze(&mut tree);
        assert_eq!(report.len(), 1);
        assert_eq!(dups(&tree, a), 3);
        assert_eq!(dups(&tree, b), 3);
        assert_eq!(dups(&tree, c), 3);
        assert_eq!(dups(&tree, single), 0);
        assert_eq!(dups(&tree, unhashed), 0);

        let group = report.group_of("h1").unwrap();
        assert_eq!(group.files, vec![c, a, b], "members are ordered by path");
        assert_eq!(group.wasted_bytes(), 20);
        assert!(report.group_of("h2").is_none());
    }

    #[test]
    fn folder_counters_follow_analysis() {
        let mut tree = FolderTree::new("archive");
        add(&mut tree, "x/a", 10, "h1");
        add(&mut tree, "x/b", 10, "h1");
        add(&mut tree, "x/c", 10, "h2");
        analyze(&mut tree);
        tree.ensure_aggregates();

        let x = tree.find(&["x"]).unwrap();
        assert_eq!(tree.node(x).unwrap().duplicates(), 2);
        assert_eq!(tree.node(tree.root()).unwrap().duplicates(), 2);
    }

    #[test]
    fn deleting_down_to_one_member_dissolves_the_group() {
        let mut tree = FolderTree::new("archive");
        let a = add(&mut tree, "a", 10, "h");
        let b = add(&mut tree, "b", 10, "h");
        let c = add(&mut tree, "c", 10, "h");
        analyze(&mut tree);

        tree.remove(b);
        tree.remove(c);
        let report = analyze(&mut tree);
        assert!(report.is_empty());
        assert_eq!(dups(&tree, a), 0);
    }

    #[test]
    fn empty_tree_has_no_groups() {
        let mut tree = FolderTree::new("archive");
        let report = analyze(&mut tree);
        assert!(report.is_empty());
        assert_eq!(report.wasted_bytes(), 0);
    }
}
