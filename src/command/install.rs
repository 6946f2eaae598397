use anyhow::Context;
use url::Url;

use crate::command::Manager;

pub fn install(manager: &Manager, url: &str) -> anyhow::Result<()> {
    let url = parse_manifest_url(url)?;
    let outcome = manager.install(&url)
        .with_context(|| format!("Failed to install pack from {}", url))?;

    let meta = &outcome.meta;
    println!("Installed {} ({}) @{}x, {}x{} cells of {}x{} px at {} fps",
        meta.id, meta.name, meta.scale, meta.cols, meta.rows, meta.cell_w, meta.cell_h, meta.fps);
    if let Some(warning) = &outcome.warning {
        println!("Warning: {}", warning);
    }
    if outcome.published.is_some() {
        println!("{} is now the active pack", meta.id);
    }
    Ok(())
}

/// Accepts URLs as well as plain paths to a local manifest.
fn parse_manifest_url(input: &str) -> anyhow::Result<Url> {
    if let Ok(url) = Url::parse(input) {
        return Ok(url);
    }
    let path = std::path::Path::new(input);
    if !path.is_file() {
        anyhow::bail!("{} is neither a URL nor an existing manifest file", input);
    }
    let path = path.canonicalize()
        .with_context(|| format!("Failed to resolve {}", input))?;
    Url::from_file_path(&path)
        .map_err(|_| anyhow::anyhow!("Cannot turn {} into a file URL", path.display()))
}
