use petpack::{read_active, ActiveSprite, PngProbe};

use crate::command::Manager;

pub fn show(manager: &Manager) -> anyhow::Result<()> {
    match read_active(manager.store(), &PngProbe) {
        ActiveSprite::Ready(publication) => {
            let [cols, rows, cell_w, cell_h] = publication.config();
            println!("Active pack: {}", publication.pack_id.as_deref().unwrap_or("(unknown)"));
            println!("Sprite:      {}", publication.sprite_asset_path.display());
            println!("Grid:        {}x{} cells of {}x{} px, {} frames at {} fps",
                cols, rows, cell_w, cell_h, publication.frame_count(), publication.fps);
            if let Some(revision) = &publication.revision {
                println!("Revision:    {}", revision);
            }
        }
        ActiveSprite::Placeholder(reason) => {
            println!("Placeholder: {}", reason);
        }
    }
    Ok(())
}
