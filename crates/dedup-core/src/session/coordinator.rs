/// The single owner of all mutable session state.
///
/// Scan events and user commands are applied here one at a time, in the
/// order they arrive. Nothing else holds the tree, so no locking is needed.
use super::snapshot::{Progress, RowSnapshot, SessionSnapshot};
use super::targets::HitTarget;
use super::{Command, Flow, SessionMessage};
use crate::analysis::{analyze, DuplicateReport};
use crate::fs::FileSystem;
use crate::model::{FolderTree, NodeIndex, NodeKind};
use crate::navigation::NavigationState;
use crate::scanner::ScanEvent;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Rows taken by the title, breadcrumbs, column header and status line.
const CHROME_ROWS: u16 = 4;

/// Two clicks on the same folder row within this interval open it.
pub const DOUBLE_CLICK_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Waiting for the walk to finish.
    Scanning,
    /// Metadata is known, fingerprints are arriving.
    Hashing,
    /// Scan complete and duplicates analysed.
    Ready,
}

/// A non-fatal problem the user should see, such as a refused deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub path: String,
    pub message: String,
}

pub struct EventCoordinator {
    fs: Arc<dyn FileSystem>,
    tree: FolderTree,
    navigation: NavigationState,
    report: DuplicateReport,
    phase: SessionPhase,
    progress: Progress,
    notices: Vec<Notice>,
    width: u16,
    height: u16,
    scan_duration: Option<Duration>,
    scan_errors: u64,
    /// Row node and time of the last list click.
    last_click: Option<(NodeIndex, Instant)>,
}

impl EventCoordinator {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        let root_name = fs
            .root()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| fs.root().display().to_string());
        let tree = FolderTree::new(&root_name);
        let navigation = NavigationState::new(tree.root());
        Self {
            fs,
            tree,
            navigation,
            report: DuplicateReport::default(),
            phase: SessionPhase::Scanning,
            progress: Progress::default(),
            notices: Vec::new(),
            width: 0,
            height: 0,
            scan_duration: None,
            scan_errors: 0,
            last_click: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn tree(&self) -> &FolderTree {
        &self.tree
    }

    pub fn navigation(&self) -> &NavigationState {
        &self.navigation
    }

    pub fn report(&self) -> &DuplicateReport {
        &self.report
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn scan_duration(&self) -> Option<Duration> {
        self.scan_duration
    }

    pub fn scan_errors(&self) -> u64 {
        self.scan_errors
    }

    /// Apply one message. Returns [`Flow::Quit`] only for `Command::Quit`.
    pub fn apply(&mut self, message: SessionMessage) -> Flow {
        match message {
            SessionMessage::Scan(event) => {
                self.apply_scan(event);
                Flow::Continue
            }
            SessionMessage::Command(command) => self.apply_command(command),
        }
    }

    pub fn apply_scan(&mut self, event: ScanEvent) {
        match event {
            ScanEvent::MetadataAvailable(records) => {
                if self.phase == SessionPhase::Scanning {
                    self.phase = SessionPhase::Hashing;
                }
                for record in &records {
                    if !record.is_hashed() {
                        self.progress.total += 1;
                    }
                    self.tree.upsert(record);
                }
                info!(
                    "Metadata for {} files, {} to hash",
                    records.len(),
                    self.progress.total
                );
                self.navigation.reclamp(&self.tree);
            }
            ScanEvent::Hashed { path, hash } => {
                self.progress.hashed += 1;
                match self.tree.find(&path) {
                    Some(idx) => {
                        self.tree.set_hash(idx, &hash);
                    }
                    None => warn!("Hash for unknown file {}", path.join("/")),
                }
            }
            ScanEvent::Complete {
                duration,
                error_count,
            } => {
                self.phase = SessionPhase::Ready;
                self.scan_duration = Some(duration);
                self.scan_errors = error_count;
                self.refresh();
                info!(
                    "Session ready after {duration:?}: {} duplicate groups, {error_count} errors",
                    self.report.len()
                );
            }
        }
    }

    pub fn apply_command(&mut self, command: Command) -> Flow {
        self.tree.ensure_aggregates();
        match command {
            Command::MoveSelection(delta) => self.navigation.move_selection(&self.tree, delta),
            Command::EnterFolder => {
                self.navigation.enter_folder(&self.tree);
            }
            Command::LeaveFolder => {
                self.navigation.leave_folder(&self.tree);
            }
            Command::JumpToDuplicateSibling => {
                self.navigation
                    .jump_to_duplicate_sibling(&self.tree, &self.report);
            }
            Command::DeleteOtherDuplicates => self.delete_other_duplicates(),
            Command::SetSort(column) => self.navigation.set_sort(&self.tree, column),
            Command::SelectByCoordinate(target) => self.select_target_at(target, Instant::now()),
            Command::Resize { width, height } => {
                self.width = width;
                self.height = height;
                let rows = usize::from(height.saturating_sub(CHROME_ROWS));
                self.navigation.set_page_rows(&self.tree, rows);
            }
            Command::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    /// Apply a click that happened at `now`.
    pub fn select_target_at(&mut self, target: HitTarget, now: Instant) {
        match target {
            HitTarget::SelectFolder(path) => match self.tree.find(&path) {
                Some(folder) => {
                    self.navigation.open_folder(&self.tree, folder);
                }
                None => debug!("Breadcrumb {} no longer exists", path.join("/")),
            },
            HitTarget::SelectFile(row) => {
                let clicked = self.navigation.view(&self.tree).get(row).copied();
                let double_click = match (clicked, self.last_click) {
                    (Some(node), Some((last, at))) => {
                        node == last && now.saturating_duration_since(at) <= DOUBLE_CLICK_INTERVAL
                    }
                    _ => false,
                };
                let is_folder = clicked
                    .and_then(|idx| self.tree.node(idx))
                    .is_some_and(|node| node.is_folder());

                self.navigation.select_index(&self.tree, row);
                if double_click && is_folder {
                    self.navigation.enter_folder(&self.tree);
                    self.last_click = None;
                } else {
                    self.last_click = clicked.map(|node| (node, now));
                }
            }
            HitTarget::ChangeSort(column) => self.navigation.set_sort(&self.tree, column),
        }
    }

    /// Delete every other member of the selected file's duplicate group.
    ///
    /// Each file is removed independently; one refusal does not stop the
    /// others. Refused files stay in the tree and produce a [`Notice`].
    fn delete_other_duplicates(&mut self) {
        let Some(selected) = self.navigation.selected(&self.tree) else {
            return;
        };
        let Some(group) = self
            .tree
            .node(selected)
            .and_then(|node| node.hash())
            .and_then(|hash| self.report.group_of(hash))
        else {
            debug!("Selection is not a duplicate, nothing to delete");
            return;
        };
        let others: Vec<NodeIndex> = group
            .files
            .iter()
            .copied()
            .filter(|&idx| idx != selected)
            .collect();

        let mut deleted = 0usize;
        for idx in others {
            let path = self.tree.full_path(idx);
            match self.fs.remove(&path) {
                Ok(()) => {
                    self.tree.remove(idx);
                    deleted += 1;
                }
                Err(err) => {
                    warn!("Failed to delete {path}: {err}");
                    self.notices.push(Notice {
                        path,
                        message: err.to_string(),
                    });
                }
            }
        }
        info!("Deleted {deleted} duplicates of {}", self.tree.full_path(selected));

        self.refresh();
        self.navigation.reveal(&self.tree, selected);
    }

    /// Re-run analysis and bring aggregates and navigation back in line
    /// with the tree.
    fn refresh(&mut self) {
        self.report = analyze(&mut self.tree);
        self.tree.ensure_aggregates();
        self.navigation.reclamp(&self.tree);
    }

    /// Build the renderer's view, resolving any pending aggregation first.
    pub fn snapshot(&mut self) -> SessionSnapshot {
        self.tree.ensure_aggregates();
        let folder = self.navigation.current();
        let cursor = self.navigation.current_cursor();
        let view = self.navigation.view(&self.tree);
        let page_rows = self.navigation.page_rows();

        let rows = view
            .iter()
            .skip(cursor.offset)
            .take(page_rows)
            .filter_map(|&idx| self.tree.node(idx))
            .map(|node| match &node.kind {
                NodeKind::Folder(info) => RowSnapshot {
                    name: node.name.to_string(),
                    is_folder: true,
                    size: node.size,
                    modified: node.modified,
                    hashed: info.hashed_count == info.leaf_count,
                    duplicates: info.duplicate_count,
                },
                NodeKind::Leaf(leaf) => RowSnapshot {
                    name: node.name.to_string(),
                    is_folder: false,
                    size: node.size,
                    modified: node.modified,
                    hashed: !leaf.hash.is_empty(),
                    duplicates: leaf.duplicates,
                },
            })
            .collect();

        SessionSnapshot {
            phase: self.phase,
            breadcrumbs: self.tree.path_segments(folder),
            folder_path: self.tree.full_path(folder),
            rows,
            total_rows: view.len(),
            selected: cursor.selected,
            offset: cursor.offset,
            sort_column: cursor.sort_column,
            ascending: cursor.is_ascending(),
            progress: self.progress,
            duplicate_groups: self.report.len(),
            wasted_bytes: self.report.wasted_bytes(),
            notices: self.notices.clone(),
            width: self.width,
            height: self.height,
            page_rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemFs;
    use crate::model::record::parse_path;
    use crate::model::{FileRecord, NodeId};
    use crate::navigation::SortColumn;
    use chrono::{TimeZone, Utc};

    fn record(path: &str, size: u64, hash: &str) -> FileRecord {
        FileRecord {
            path: parse_path(path),
            identity: NodeId(0),
            size,
            modified: Utc.timestamp_opt(1_000, 0).unwrap(),
            hash: hash.to_string(),
        }
    }

    fn complete() -> ScanEvent {
        ScanEvent::Complete {
            duration: Duration::from_millis(5),
            error_count: 0,
        }
    }

    fn coordinator() -> EventCoordinator {
        let mut coordinator = EventCoordinator::new(Arc::new(MemFs::new("/sim/archive")));
        coordinator.apply_command(Command::Resize {
            width: 80,
            height: 24,
        });
        coordinator
    }

    #[test]
    fn phases_advance_with_scan_events() {
        let mut c = coordinator();
        assert_eq!(c.phase(), SessionPhase::Scanning);
        c.apply_scan(ScanEvent::MetadataAvailable(vec![
            record("a", 1, ""),
            record("b", 1, "known"),
        ]));
        assert_eq!(c.phase(), SessionPhase::Hashing);
        assert_eq!(c.progress(), Progress { hashed: 0, total: 1 });

        c.apply_scan(ScanEvent::Hashed {
            path: parse_path("a"),
            hash: "known".into(),
        });
        assert_eq!(c.progress().hashed, 1);
        c.apply_scan(complete());
        assert_eq!(c.phase(), SessionPhase::Ready);
        assert_eq!(c.report().len(), 1);
    }

    #[test]
    fn complete_while_scanning_goes_straight_to_ready() {
        let mut c = coordinator();
        c.apply_scan(complete());
        assert_eq!(c.phase(), SessionPhase::Ready);
        let snapshot = c.snapshot();
        assert!(snapshot.rows.is_empty());
        assert_eq!(snapshot.selected, 0);
    }

    #[test]
    fn resize_sets_page_rows_with_minimum_of_one() {
        let mut c = coordinator();
        assert_eq!(c.snapshot().page_rows, 20);
        c.apply_command(Command::Resize {
            width: 80,
            height: 3,
        });
        assert_eq!(c.snapshot().page_rows, 1);
    }

    #[test]
    fn snapshot_reports_folder_rollups() {
        let mut c = coordinator();
        c.apply_scan(ScanEvent::MetadataAvailable(vec![
            record("docs/a", 10, "h"),
            record("docs/b", 10, "h"),
            record("docs/c", 5, ""),
        ]));
        c.apply_scan(complete());

        let snapshot = c.snapshot();
        assert_eq!(snapshot.rows.len(), 1);
        let docs = &snapshot.rows[0];
        assert!(docs.is_folder);
        assert_eq!(docs.size, 25);
        assert_eq!(docs.duplicates, 2);
        assert!(!docs.hashed);
        assert_eq!(snapshot.duplicate_groups, 1);
        assert_eq!(snapshot.wasted_bytes, 10);
    }

    fn two_entries() -> EventCoordinator {
        let mut c = coordinator();
        c.apply_scan(ScanEvent::MetadataAvailable(vec![
            record("a.txt", 1, "x"),
            record("sub/b.txt", 1, "y"),
        ]));
        c.apply_scan(complete());
        c
    }

    #[test]
    fn slow_second_click_only_selects() {
        let mut c = two_entries();
        let t0 = Instant::now();
        c.select_target_at(HitTarget::SelectFile(1), t0);
        c.select_target_at(
            HitTarget::SelectFile(1),
            t0 + DOUBLE_CLICK_INTERVAL + Duration::from_millis(1),
        );
        let snapshot = c.snapshot();
        assert_eq!(snapshot.folder_path, "");
        assert_eq!(snapshot.selected, 1);
    }

    #[test]
    fn double_click_needs_the_same_row() {
        let mut c = two_entries();
        let t0 = Instant::now();
        c.select_target_at(HitTarget::SelectFile(0), t0);
        c.select_target_at(HitTarget::SelectFile(1), t0 + Duration::from_millis(100));
        assert_eq!(c.snapshot().folder_path, "");
    }

    #[test]
    fn double_click_on_folder_enters_it() {
        let mut c = two_entries();
        let t0 = Instant::now();
        c.select_target_at(HitTarget::SelectFile(1), t0);
        assert_eq!(c.snapshot().folder_path, "");
        c.select_target_at(HitTarget::SelectFile(1), t0 + Duration::from_millis(200));
        assert_eq!(c.snapshot().folder_path, "sub");

        c.apply_command(Command::SelectByCoordinate(HitTarget::SelectFolder(vec![])));
        assert_eq!(c.snapshot().folder_path, "");

        c.apply_command(Command::SelectByCoordinate(HitTarget::ChangeSort(
            SortColumn::Name,
        )));
        assert!(!c.snapshot().ascending);
    }

    #[test]
    fn quit_ends_the_flow() {
        let mut c = coordinator();
        assert_eq!(
            c.apply(SessionMessage::Command(Command::LeaveFolder)),
            Flow::Continue
        );
        assert_eq!(c.apply(SessionMessage::Command(Command::Quit)), Flow::Quit);
    }
}
