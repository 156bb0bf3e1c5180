/// Data model: file records and the arena-allocated folder tree.
pub mod file_node;
pub mod file_tree;
pub mod record;
pub mod size;

pub use file_node::{FileNode, FolderInfo, LeafInfo, NodeIndex, NodeKind};
pub use file_tree::FolderTree;
pub use record::{FileRecord, NodeId};
