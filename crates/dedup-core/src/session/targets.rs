/// Pointer hit-testing for whatever draws the session.
///
/// The renderer records one [`HitRegion`] per clickable span while drawing;
/// the input layer maps a click back to a [`HitTarget`] with [`hit_test`] and
/// sends it as `Command::SelectByCoordinate`.
use crate::navigation::SortColumn;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HitTarget {
    /// A breadcrumb: open the folder at this path (empty = root).
    SelectFolder(Vec<String>),
    /// A list row, by its position in the current folder's sorted view.
    SelectFile(usize),
    /// A column header.
    ChangeSort(SortColumn),
}

/// A rectangle in cell coordinates. `x2` is exclusive, `y1..=y2` inclusive,
/// matching how a renderer marks a span before and after writing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HitRegion {
    pub x1: u16,
    pub x2: u16,
    pub y1: u16,
    pub y2: u16,
    pub target: HitTarget,
}

impl HitRegion {
    pub fn contains(&self, x: u16, y: u16) -> bool {
        self.x1 <= x && x < self.x2 && self.y1 <= y && y <= self.y2
    }
}

/// First region containing `(x, y)`.
pub fn hit_test(regions: &[HitRegion], x: u16, y: u16) -> Option<&HitTarget> {
    regions
        .iter()
        .find(|region| region.contains(x, y))
        .map(|region| &region.target)
}
