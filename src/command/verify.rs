use anyhow::Context;

use crate::command::Manager;

pub fn verify(manager: &Manager, prune: bool) -> anyhow::Result<()> {
    let report = manager.verify(prune)
        .context("Failed to verify store")?;

    if report.is_clean() {
        println!("Store is consistent");
        return Ok(());
    }

    let action = if report.pruned { "Deleted" } else { "Found" };
    for dir in &report.orphan_dirs {
        println!("{} orphaned pack directory: {}", action, dir.display());
    }
    for file in &report.temp_files {
        println!("{} leftover temp file: {}", action, file.display());
    }
    for id in &report.incomplete {
        println!("Pack {} is missing its manifest or sprite, reinstall it", id);
    }
    if !report.pruned && (!report.orphan_dirs.is_empty() || !report.temp_files.is_empty()) {
        println!("Run with --prune to delete leftovers");
    }
    Ok(())
}
