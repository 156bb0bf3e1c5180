/// Folder navigation: which folder is open, which row is selected, how far
/// the list is scrolled and how each folder is sorted.
///
/// Every folder keeps its own [`NavigationCursor`], so leaving a folder and
/// coming back restores the previous selection and sort. The state only
/// stores indices; it is always handed the tree it describes.
pub mod cursor;
pub mod sort;

pub use cursor::{NavigationCursor, SortColumn};

use crate::analysis::DuplicateReport;
use crate::model::{FolderTree, NodeIndex};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct NavigationState {
    /// Open folders from the root down to the current folder.
    trail: Vec<NodeIndex>,
    cursors: HashMap<NodeIndex, NavigationCursor>,
    page_rows: usize,
}

impl NavigationState {
    pub fn new(root: NodeIndex) -> Self {
        Self {
            trail: vec![root],
            cursors: HashMap::new(),
            page_rows: 1,
        }
    }

    /// The folder currently displayed.
    #[inline]
    pub fn current(&self) -> NodeIndex {
        self.trail[self.trail.len() - 1]
    }

    pub fn trail(&self) -> &[NodeIndex] {
        &self.trail
    }

    #[inline]
    pub fn page_rows(&self) -> usize {
        self.page_rows
    }

    /// Cursor of `folder`, or the default if it was never visited.
    pub fn cursor(&self, folder: NodeIndex) -> NavigationCursor {
        self.cursors.get(&folder).copied().unwrap_or_default()
    }

    pub fn current_cursor(&self) -> NavigationCursor {
        self.cursor(self.current())
    }

    /// Children of the current folder in display order.
    pub fn view(&self, tree: &FolderTree) -> Vec<NodeIndex> {
        sort::sorted_children(tree, self.current(), &self.current_cursor())
    }

    /// Node under the selection, if the current folder is not empty.
    pub fn selected(&self, tree: &FolderTree) -> Option<NodeIndex> {
        self.view(tree).get(self.current_cursor().selected).copied()
    }

    /// Set the number of visible rows (at least one) and keep the selection
    /// on screen.
    pub fn set_page_rows(&mut self, tree: &FolderTree, rows: usize) {
        self.page_rows = rows.max(1);
        self.clamp_current(tree);
    }

    /// Move the selection by `delta` rows, stopping at either end.
    pub fn move_selection(&mut self, tree: &FolderTree, delta: isize) {
        let folder = self.current();
        let cursor = self.cursors.entry(folder).or_default();
        cursor.selected = cursor.selected.saturating_add_signed(delta);
        self.clamp_current(tree);
    }

    /// Select row `index` of the current view (clamped to the last row).
    pub fn select_index(&mut self, tree: &FolderTree, index: usize) {
        let folder = self.current();
        self.cursors.entry(folder).or_default().selected = index;
        self.clamp_current(tree);
    }

    /// Open the selected folder. Returns `false` when the selection is a
    /// file or the folder is empty.
    pub fn enter_folder(&mut self, tree: &FolderTree) -> bool {
        let Some(selected) = self.selected(tree) else {
            return false;
        };
        if !tree.node(selected).is_some_and(|node| node.is_folder()) {
            return false;
        }
        self.trail.push(selected);
        self.clamp_current(tree);
        true
    }

    /// Return to the parent folder with the folder just left selected.
    /// Returns `false` at the root.
    pub fn leave_folder(&mut self, tree: &FolderTree) -> bool {
        if self.trail.len() <= 1 {
            return false;
        }
        let Some(left) = self.trail.pop() else {
            return false;
        };
        self.select_node(tree, left);
        true
    }

    /// Open `folder` directly, rebuilding the trail from the root.
    pub fn open_folder(&mut self, tree: &FolderTree, folder: NodeIndex) -> bool {
        if !tree.node(folder).is_some_and(|node| node.is_folder()) {
            return false;
        }
        self.trail = tree.ancestry(folder);
        self.clamp_current(tree);
        true
    }

    /// Open the folder containing `node` and select it.
    pub fn reveal(&mut self, tree: &FolderTree, node: NodeIndex) -> bool {
        let Some(parent) = tree.node(node).and_then(|n| n.parent) else {
            return false;
        };
        if !self.open_folder(tree, parent) {
            return false;
        }
        self.select_node(tree, node);
        true
    }

    /// Jump to the next member (by full path, wrapping) of the selected
    /// file's duplicate group.
    pub fn jump_to_duplicate_sibling(&mut self, tree: &FolderTree, report: &DuplicateReport) -> bool {
        let Some(selected) = self.selected(tree) else {
            return false;
        };
        let Some(group) = tree
            .node(selected)
            .and_then(|node| node.hash())
            .and_then(|hash| report.group_of(hash))
        else {
            return false;
        };
        let Some(pos) = group.files.iter().position(|&idx| idx == selected) else {
            return false;
        };
        let next = group.files[(pos + 1) % group.files.len()];
        debug!("Jumping to duplicate {}", tree.full_path(next));
        self.reveal(tree, next)
    }

    /// Sort the current folder by `column`, keeping the selected node
    /// selected.
    pub fn set_sort(&mut self, tree: &FolderTree, column: SortColumn) {
        let selected = self.selected(tree);
        let folder = self.current();
        self.cursors.entry(folder).or_default().choose_column(column);
        match selected {
            Some(node) => self.select_node(tree, node),
            None => self.clamp_current(tree),
        }
    }

    /// Restore every invariant after the tree changed shape: forget removed
    /// folders, fall back to the nearest surviving ancestor and clamp all
    /// cursors.
    pub fn reclamp(&mut self, tree: &FolderTree) {
        if let Some(dead) = self.trail.iter().position(|&idx| !tree.contains(idx)) {
            debug!("Open folder was removed, moving up {} levels", self.trail.len() - dead);
            self.trail.truncate(dead);
        }
        if self.trail.is_empty() {
            self.trail.push(tree.root());
        }
        self.cursors.retain(|&folder, _| tree.contains(folder));
        let rows = self.page_rows;
        for (&folder, cursor) in self.cursors.iter_mut() {
            cursor.clamp(tree.children(folder).len(), rows);
        }
    }

    /// Select `node` if it is a child of the current folder.
    fn select_node(&mut self, tree: &FolderTree, node: NodeIndex) {
        if let Some(index) = self.view(tree).iter().position(|&idx| idx == node) {
            let folder = self.current();
            self.cursors.entry(folder).or_default().selected = index;
        }
        self.clamp_current(tree);
    }

    fn clamp_current(&mut self, tree: &FolderTree) {
        let folder = self.current();
        let len = tree.children(folder).len();
        let rows = self.page_rows;
        self.cursors.entry(folder).or_default().clamp(len, rows);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use crate::model::record::parse_path;
    use crate::model::{FileRecord, NodeId};
    use chrono::{TimeZone, Utc};

    fn add(tree: &mut FolderTree, path: &str, size: u64, hash: &str) -> NodeIndex {
        tree.upsert(&FileRecord {
            path: parse_path(path),
            identity: NodeId(0),
            size,
            modified: Utc.timestamp_opt(size as i64, 0).unwrap(),
            hash: hash.to_string(),
        })
        .unwrap()
    }

    fn name(tree: &FolderTree, idx: Option<NodeIndex>) -> String {
        tree.node(idx.unwrap()).unwrap().name.to_string()
    }

    fn sample() -> FolderTree {
        let mut tree = FolderTree::new("archive");
        add(&mut tree, "a.txt", 30, "h1");
        add(&mut tree, "b.txt", 10, "h2");
        add(&mut tree, "docs/c.txt", 20, "h1");
        add(&mut tree, "docs/d.txt", 5, "h3");
        tree.ensure_aggregates();
        tree
    }

    #[test]
    fn move_selection_stops_at_both_ends() {
        let tree = sample();
        let mut nav = NavigationState::new(tree.root());
        nav.set_page_rows(&tree, 10);
        nav.move_selection(&tree, -5);
        assert_eq!(nav.current_cursor().selected, 0);
        nav.move_selection(&tree, 50);
        assert_eq!(nav.current_cursor().selected, 2);
        assert_eq!(name(&tree, nav.selected(&tree)), "docs");
    }

    #[test]
    fn enter_and_leave_restore_selection() {
        let tree = sample();
        let mut nav = NavigationState::new(tree.root());
        nav.set_page_rows(&tree, 10);
        nav.move_selection(&tree, 2);
        assert!(nav.enter_folder(&tree));
        assert_eq!(name(&tree, nav.selected(&tree)), "c.txt");
        nav.move_selection(&tree, 1);

        assert!(nav.leave_folder(&tree));
        assert_eq!(nav.current(), tree.root());
        assert_eq!(name(&tree, nav.selected(&tree)), "docs");
        assert!(!nav.leave_folder(&tree));

        nav.enter_folder(&tree);
        assert_eq!(name(&tree, nav.selected(&tree)), "d.txt", "cursor is per folder");
    }

    #[test]
    fn entering_a_file_does_nothing() {
        let tree = sample();
        let mut nav = NavigationState::new(tree.root());
        assert!(!nav.enter_folder(&tree));
        assert_eq!(nav.current(), tree.root());
    }

    #[test]
    fn scrolling_keeps_selection_visible() {
        let mut tree = FolderTree::new("archive");
        for i in 0..20 {
            add(&mut tree, &format!("f{i:02}"), 1, "");
        }
        let mut nav = NavigationState::new(tree.root());
        nav.set_page_rows(&tree, 5);
        nav.move_selection(&tree, 7);
        let cursor = nav.current_cursor();
        assert_eq!(cursor.offset, 3);
        nav.move_selection(&tree, -6);
        assert_eq!(nav.current_cursor().offset, 1);
    }

    #[test]
    fn set_sort_keeps_selected_node_and_toggles_exactly() {
        let tree = sample();
        let mut nav = NavigationState::new(tree.root());
        nav.set_page_rows(&tree, 10);
        nav.move_selection(&tree, 1);
        let before = nav.view(&tree);
        let selected = nav.selected(&tree);

        nav.set_sort(&tree, SortColumn::Name);
        let mut after = nav.view(&tree);
        assert_eq!(nav.selected(&tree), selected);
        after.reverse();
        assert_eq!(after, before);

        nav.set_sort(&tree, SortColumn::Size);
        assert!(nav.current_cursor().is_ascending());
        assert_eq!(nav.selected(&tree), selected);
        assert_eq!(name(&tree, nav.view(&tree).first().copied()), "b.txt");
    }

    #[test]
    fn jump_cycles_through_group_across_folders() {
        let mut tree = sample();
        let report = analyze(&mut tree);
        tree.ensure_aggregates();
        let mut nav = NavigationState::new(tree.root());
        nav.set_page_rows(&tree, 10);

        assert!(nav.jump_to_duplicate_sibling(&tree, &report));
        assert_eq!(tree.full_path(nav.current()), "docs");
        assert_eq!(name(&tree, nav.selected(&tree)), "c.txt");

        assert!(nav.jump_to_duplicate_sibling(&tree, &report));
        assert_eq!(nav.current(), tree.root());
        assert_eq!(name(&tree, nav.selected(&tree)), "a.txt");

        nav.move_selection(&tree, 1);
        assert!(!nav.jump_to_duplicate_sibling(&tree, &report), "b.txt is unique");
    }

    #[test]
    fn reclamp_after_deleting_last_child() {
        let mut tree = sample();
        let mut nav = NavigationState::new(tree.root());
        nav.set_page_rows(&tree, 10);
        nav.move_selection(&tree, 2);
        nav.enter_folder(&tree);
        nav.move_selection(&tree, 1);

        let d = tree.find(&["docs", "d.txt"]).unwrap();
        tree.remove(d);
        nav.reclamp(&tree);
        assert_eq!(nav.current_cursor().selected, 0);
        assert_eq!(name(&tree, nav.selected(&tree)), "c.txt");
    }

    #[test]
    fn reclamp_moves_up_when_open_folder_is_pruned() {
        let mut tree = sample();
        let mut nav = NavigationState::new(tree.root());
        let docs = tree.find(&["docs"]).unwrap();
        assert!(nav.open_folder(&tree, docs));

        for path in [["docs", "c.txt"], ["docs", "d.txt"]] {
            let idx = tree.find(&path).unwrap();
            tree.remove(idx);
        }
        nav.reclamp(&tree);
        assert_eq!(nav.current(), tree.root());
        assert_eq!(nav.trail(), &[tree.root()]);
        assert!(nav.current_cursor().selected < tree.children(tree.root()).len());
    }

    #[test]
    fn open_folder_rejects_files() {
        let tree = sample();
        let mut nav = NavigationState::new(tree.root());
        let file = tree.find(&["a.txt"]).unwrap();
        assert!(!nav.open_folder(&tree, file));
        assert_eq!(nav.current(), tree.root());
    }
}
