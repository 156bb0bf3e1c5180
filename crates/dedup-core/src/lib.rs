/// Dedup Core: scanning, fingerprinting, duplicate analysis and navigation
/// for an interactive duplicate-file finder.
///
/// This crate contains all business logic with zero UI dependencies. A
/// frontend renders [`session::SessionSnapshot`]s and sends
/// [`session::Command`]s; everything else happens here.
///
/// # Modules
///
/// - [`model`]: Arena-allocated folder tree and file records.
/// - [`fs`]: Filesystem trait with real and in-memory backends.
/// - [`cache`]: Persistent fingerprint cache keyed by file identity.
/// - [`hasher`]: Bounded-cost content fingerprints.
/// - [`scanner`]: Background walk and hash with ordered events.
/// - [`analysis`]: Duplicate grouping.
/// - [`navigation`]: Per-folder selection, scrolling and sorting.
/// - [`session`]: The event coordinator that ties it all together.
pub mod analysis;
pub mod cache;
pub mod config;
pub mod error;
pub mod fs;
pub mod hasher;
pub mod model;
pub mod navigation;
pub mod scanner;
pub mod session;

pub use config::{DedupConfig, HashPolicy};
pub use error::{DedupError, Result};
