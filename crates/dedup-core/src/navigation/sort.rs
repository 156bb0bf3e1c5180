/// Child ordering for folder listings.
///
/// Order: active column, then case-insensitive name, then the remaining
/// columns among {size, time} in that fixed order, then the exact name.
/// Names are unique within a folder, so this is a strict total order and
/// reversing the direction reverses the list exactly.
use super::cursor::{NavigationCursor, SortColumn};
use crate::model::{FileNode, FolderTree, NodeIndex};
use std::cmp::Ordering;

fn by_column(a: &FileNode, b: &FileNode, column: SortColumn) -> Ordering {
    match column {
        SortColumn::Name => Ordering::Equal,
        SortColumn::Time => a.modified.cmp(&b.modified),
        SortColumn::Size => a.size.cmp(&b.size),
    }
}

/// Compare two siblings under `column`, ascending. `a_lower` and `b_lower`
/// are the lowercased names.
pub fn compare(
    a: &FileNode,
    a_lower: &str,
    b: &FileNode,
    b_lower: &str,
    column: SortColumn,
) -> Ordering {
    by_column(a, b, column)
        .then_with(|| a_lower.cmp(b_lower))
        .then_with(|| match column {
            SortColumn::Size => by_column(a, b, SortColumn::Time),
            _ => by_column(a, b, SortColumn::Size),
        })
        .then_with(|| match column {
            SortColumn::Name => by_column(a, b, SortColumn::Time),
            _ => Ordering::Equal,
        })
        .then_with(|| a.name.cmp(&b.name))
}

/// Children of `folder` in the order configured by `cursor`.
pub fn sorted_children(
    tree: &FolderTree,
    folder: NodeIndex,
    cursor: &NavigationCursor,
) -> Vec<NodeIndex> {
    let mut keyed: Vec<(NodeIndex, &FileNode, String)> = tree
        .children(folder)
        .iter()
        .filter_map(|&idx| {
            tree.node(idx)
                .map(|node| (idx, node, node.name.as_str().to_lowercase()))
        })
        .collect();

    let column = cursor.sort_column;
    let ascending = cursor.is_ascending();
    keyed.sort_by(|(_, a, a_lower), (_, b, b_lower)| {
        let order = compare(a, a_lower, b, b_lower, column);
        if ascending {
            order
        } else {
            order.reverse()
        }
    });
    keyed.into_iter().map(|(idx, _, _)| idx).collect()
}
