/// Read-only view of a session, produced once per frame for the renderer.
use super::coordinator::{Notice, SessionPhase};
use crate::navigation::SortColumn;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowSnapshot {
    pub name: String,
    pub is_folder: bool,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    /// For a folder: every leaf below it is hashed.
    pub hashed: bool,
    /// For a file: size of its duplicate group (0 if unique).
    /// For a folder: number of duplicated files below it.
    pub duplicates: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub hashed: u64,
    pub total: u64,
}

impl Progress {
    /// Fraction of unknown files hashed so far, 1.0 when nothing is pending.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.hashed as f64 / self.total as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    /// Path segments of the open folder, root first (root = empty).
    pub breadcrumbs: Vec<String>,
    pub folder_path: String,
    /// Rows of the current page, starting at `offset`.
    pub rows: Vec<RowSnapshot>,
    /// Number of rows in the open folder.
    pub total_rows: usize,
    /// Absolute index of the selected row.
    pub selected: usize,
    pub offset: usize,
    pub sort_column: SortColumn,
    pub ascending: bool,
    pub progress: Progress,
    pub duplicate_groups: usize,
    pub wasted_bytes: u64,
    pub notices: Vec<Notice>,
    pub width: u16,
    pub height: u16,
    pub page_rows: usize,
}

impl SessionSnapshot {
    /// The selected row, if it is on the current page.
    pub fn selected_row(&self) -> Option<&RowSnapshot> {
        self.selected
            .checked_sub(self.offset)
            .and_then(|i| self.rows.get(i))
    }
}
