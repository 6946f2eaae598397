use std::collections::HashSet;
use std::path::PathBuf;

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{PackError, Result};
use crate::index::PackIndex;
use crate::store::{fs_ext, StoreHandle, INDEX_FILE_NAME};

/// Differences between the index and what is actually under `Packs/`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    /// Pack directories with no index entry, e.g. left behind by a failed install.
    pub orphan_dirs: Vec<PathBuf>,
    /// Indexed packs whose manifest or sprite is missing.
    pub incomplete: Vec<String>,
    /// Temp files from interrupted atomic writes.
    pub temp_files: Vec<PathBuf>,
    pub pruned: bool,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.orphan_dirs.is_empty() && self.incomplete.is_empty() && self.temp_files.is_empty()
    }
}

pub fn scan(store: &StoreHandle, index: &PackIndex) -> Result<VerifyReport> {
    let mut report = VerifyReport::default();
    let root = store.packs_root();
    if !root.is_dir() {
        return Ok(report);
    }

    let known: HashSet<&str> = index.installed.iter().map(|m| m.id.as_str()).collect();
    for entry in WalkDir::new(&root).min_depth(1).max_depth(2).sort_by_file_name() {
        let entry = entry.map_err(|e| PackError::io(
            format!("Failed to walk {}", root.display()),
            e.into_io_error().unwrap_or_else(|| std::io::ErrorKind::Other.into()),
        ))?;
        let path = entry.path();

        if entry.file_type().is_file() && fs_ext::is_temp_file(path) {
            report.temp_files.push(path.to_path_buf());
            continue;
        }
        if entry.depth() != 1 || !entry.file_type().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if name != INDEX_FILE_NAME && !known.contains(&*name) {
            report.orphan_dirs.push(path.to_path_buf());
        }
    }

    for meta in &index.installed {
        let manifest = store.manifest_path(&meta.id)?;
        let sprite = store.asset_path(&meta.id, &meta.filename)?;
        if !manifest.is_file() || !sprite.is_file() {
            debug!("Pack {} is missing files", meta.id);
            report.incomplete.push(meta.id.clone());
        }
    }

    Ok(report)
}

/// Deletes orphan directories and temp files found by [`scan`]. Index entries are left alone.
///
/// Only safe while no other process is writing to the store.
pub fn prune(report: &mut VerifyReport) -> Result<()> {
    for dir in &report.orphan_dirs {
        fs_ext::remove_dir_if_exists(dir)?;
        info!("Pruned orphan directory {}", dir.display());
    }
    for file in &report.temp_files {
        // may live inside an orphan directory that is already gone
        fs_ext::remove_file_if_exists(file)?;
        info!("Pruned temp file {}", file.display());
    }
    report.pruned = true;
    Ok(())
}
