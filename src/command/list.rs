use crate::command::Manager;

pub fn list(manager: &Manager) -> anyhow::Result<()> {
    let index = manager.list();
    if index.installed.is_empty() {
        println!("No packs installed in {}", manager.store().root().display());
        return Ok(());
    }

    for meta in &index.installed {
        let marker = if index.active_pack_id.as_deref() == Some(meta.id.as_str()) { "*" } else { " " };
        println!("{} {:<24} {:<24} {}x{} • {}x{} px • @{}x • {:.1} fps",
            marker, meta.id, meta.name, meta.cols, meta.rows, meta.cell_w, meta.cell_h, meta.scale, meta.fps);
    }
    Ok(())
}
