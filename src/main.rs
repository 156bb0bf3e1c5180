//! Dedup: interactive duplicate-file finder.
//!
//! Thin binary entry point. All logic lives in the `dedup-core` crate; this
//! binary scans one archive, waits for hashing to finish and prints the
//! duplicate groups it found.

use anyhow::Context;
use dedup_core::fs::RealFs;
use dedup_core::model::size::{format_bytes, format_size};
use dedup_core::session::{Session, SessionPhase};
use dedup_core::DedupConfig;
use std::path::PathBuf;
use std::sync::Arc;

fn load_config() -> anyhow::Result<DedupConfig> {
    match std::env::var_os("DEDUP_CONFIG") {
        Some(path) => {
            let path = PathBuf::from(path);
            DedupConfig::load(&path)
                .with_context(|| format!("loading configuration from {}", path.display()))
        }
        None => Ok(DedupConfig::default()),
    }
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so the report on stdout stays clean.
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    let root = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let config = load_config()?;
    tracing::info!("Dedup starting on {}", root.display());

    let fs = RealFs::open(&root, config.reserved_prefix.clone())
        .with_context(|| format!("opening archive {}", root.display()))?;
    let mut session = Session::start(Arc::new(fs), &config)?;
    session.wait_until_ready();

    let coordinator = session.coordinator();
    if coordinator.phase() != SessionPhase::Ready {
        anyhow::bail!("scan of {} did not complete", root.display());
    }

    let tree = coordinator.tree();
    let report = coordinator.report();
    for group in &report.groups {
        println!(
            "{} copies of {} bytes ({}):",
            group.files.len(),
            format_bytes(group.size),
            format_size(group.size)
        );
        for &file in &group.files {
            println!("  {}", tree.full_path(file));
        }
    }

    let progress = coordinator.progress();
    println!(
        "{} duplicate groups, {} reclaimable, {} of {} new files hashed, {} errors",
        report.len(),
        format_size(report.wasted_bytes()),
        progress.hashed,
        progress.total,
        coordinator.scan_errors()
    );
    Ok(())
}
