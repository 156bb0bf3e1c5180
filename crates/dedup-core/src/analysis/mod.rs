/// Analysis passes over the folder tree.
pub mod duplicates;

pub use duplicates::{analyze, DuplicateGroup, DuplicateReport};
