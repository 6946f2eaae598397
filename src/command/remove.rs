use anyhow::Context;

use crate::command::Manager;

pub fn remove(manager: &Manager, id: &str) -> anyhow::Result<()> {
    let known = manager.list().meta(id).is_some();
    manager.remove(id)
        .with_context(|| format!("Failed to remove {}", id))?;
    if known {
        println!("Removed {}", id);
    } else {
        println!("{} is not installed, nothing to remove", id);
    }
    Ok(())
}
