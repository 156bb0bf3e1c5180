/// Per-folder selection, scroll position and sort settings.
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
    Name,
    Time,
    Size,
}

impl SortColumn {
    pub const ALL: [SortColumn; 3] = [SortColumn::Name, SortColumn::Time, SortColumn::Size];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Self::Name => 0,
            Self::Time => 1,
            Self::Size => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Time => "Date Modified",
            Self::Size => "Size",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavigationCursor {
    pub selected: usize,
    pub offset: usize,
    pub sort_column: SortColumn,
    /// Last direction used for each column, indexed by [`SortColumn::index`].
    pub ascending: [bool; 3],
}

impl Default for NavigationCursor {
    fn default() -> Self {
        Self {
            selected: 0,
            offset: 0,
            sort_column: SortColumn::Name,
            ascending: [true; 3],
        }
    }
}

impl NavigationCursor {
    /// Direction of the active column.
    #[inline]
    pub fn is_ascending(&self) -> bool {
        self.ascending[self.sort_column.index()]
    }

    /// Re-selecting the active column flips its direction; choosing another
    /// column brings back that column's own last direction.
    pub fn choose_column(&mut self, column: SortColumn) {
        if self.sort_column == column {
            let dir = &mut self.ascending[column.index()];
            *dir = !*dir;
        } else {
            self.sort_column = column;
        }
    }

    /// Restore `selected < len` (0 when empty) and keep the selection
    /// inside a window of `rows` visible rows starting at `offset`.
    pub fn clamp(&mut self, len: usize, rows: usize) {
        let rows = rows.max(1);
        self.selected = self.selected.min(len.saturating_sub(1));
        if self.selected < self.offset {
            self.offset = self.selected;
        } else if self.selected >= self.offset + rows {
            self.offset = self.selected + 1 - rows;
        }
        self.offset = self.offset.min(len.saturating_sub(rows));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_pulls_selection_back_into_range() {
        let mut cursor = NavigationCursor {
            selected: 9,
            offset: 5,
            ..Default::default()
        };
        cursor.clamp(4, 3);
        assert_eq!(cursor.selected, 3);
        assert_eq!(cursor.offset, 1);

        cursor.clamp(0, 3);
        assert_eq!(cursor.selected, 0);
        assert_eq!(cursor.offset, 0);
    }

    #[test]
    fn clamp_scrolls_down_to_follow_selection() {
        let mut cursor = NavigationCursor {
            selected: 12,
            ..Default::default()
        };
        cursor.clamp(20, 5);
        assert_eq!(cursor.offset, 8);
        assert!(cursor.offset <= cursor.selected && cursor.selected < cursor.offset + 5);
    }

    #[test]
    fn clamp_never_leaves_blank_rows_below_a_short_list() {
        let mut cursor = NavigationCursor {
            selected: 2,
            offset: 2,
            ..Default::default()
        };
        cursor.clamp(3, 10);
        assert_eq!(cursor.offset, 0);
    }

    #[test]
    fn choosing_columns_remembers_direction_per_column() {
        let mut cursor = NavigationCursor::default();
        cursor.choose_column(SortColumn::Size);
        assert!(cursor.is_ascending());
        cursor.choose_column(SortColumn::Size);
        assert!(!cursor.is_ascending());

        cursor.choose_column(SortColumn::Name);
        assert!(cursor.is_ascending());
        cursor.choose_column(SortColumn::Size);
        assert!(!cursor.is_ascending(), "size keeps its descending direction");
    }
}
