use anyhow::Context;

use crate::command::Manager;

pub fn activate(manager: &Manager, id: &str) -> anyhow::Result<()> {
    let published = manager.activate(id)
        .with_context(|| format!("Failed to activate {}", id))?;
    let [cols, rows, cell_w, cell_h] = published.config();
    println!("Activated {}: {}x{} cells of {}x{} px at {} fps, sprite at {}",
        id, cols, rows, cell_w, cell_h, published.fps, published.sprite_asset_path.display());
    Ok(())
}
