//! The active pack as seen by rendering surfaces.
//!
//! Writers copy the sprite to a fixed path first and publish the grid config second, so any
//! reader that sees a config also finds a sprite. Readers check the pair and fall back to a
//! placeholder instead of trusting it.

use std::fmt;
use std::path::PathBuf;

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::digest;
use crate::error::{IoContext, Result};
use crate::image::ImageProbe;
use crate::index::PackMeta;
use crate::store::{fs_ext, StoreHandle};

pub const KEY_CFG: &str = "currentCfg";
pub const KEY_FPS: &str = "currentFps";
pub const KEY_PACK_ID: &str = "currentPackID";
pub const KEY_SPRITE_FILENAME: &str = "currentSpriteFilename";
pub const KEY_REVISION: &str = "currentRevision";

const PUBLISHED_KEYS: [&str; 5] = [KEY_CFG, KEY_FPS, KEY_PACK_ID, KEY_SPRITE_FILENAME, KEY_REVISION];

/// Frame rate assumed when a publication carries no usable fps.
pub const DEFAULT_FPS: f64 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ActivePublication {
    pub sprite_asset_path: PathBuf,
    pub cols: u32,
    pub rows: u32,
    pub cell_w: u32,
    pub cell_h: u32,
    pub fps: f64,
    pub pack_id: Option<String>,
    pub revision: Option<String>,
}

/// Pixel rectangle of one frame inside the sprite sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl ActivePublication {
    pub fn config(&self) -> [u32; 4] {
        [self.cols, self.rows, self.cell_w, self.cell_h]
    }

    pub fn expected_dimensions(&self) -> (u32, u32) {
        (self.cols.saturating_mul(self.cell_w), self.rows.saturating_mul(self.cell_h))
    }

    pub fn frame_count(&self) -> u64 {
        self.cols as u64 * self.rows as u64
    }

    /// Frames run left to right, then top to bottom, wrapping after the last row.
    pub fn frame_rect(&self, index: u64) -> FrameRect {
        let cols = self.cols.max(1) as u64;
        let rows = self.rows.max(1) as u64;
        let col = (index % cols) as u32;
        let row = ((index / cols) % rows) as u32;
        FrameRect {
            x: col.saturating_mul(self.cell_w),
            y: row.saturating_mul(self.cell_h),
            w: self.cell_w,
            h: self.cell_h,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlaceholderReason {
    NotPublished,
    AssetMissing(PathBuf),
    BadImage(String),
    SizeMismatch { actual: (u32, u32), expected: (u32, u32) },
}

impl fmt::Display for PlaceholderReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaceholderReason::NotPublished => write!(f, "no active pack"),
            PlaceholderReason::AssetMissing(path) => write!(f, "sprite not found at {}", path.display()),
            PlaceholderReason::BadImage(reason) => write!(f, "bad image: {}", reason),
            PlaceholderReason::SizeMismatch { actual, expected } => write!(
                f,
                "size mismatch: {}x{}, expected {}x{}",
                actual.0, actual.1, expected.0, expected.1
            ),
        }
    }
}

/// What a rendering surface should draw right now.
#[derive(Debug, Clone, PartialEq)]
pub enum ActiveSprite {
    Ready(ActivePublication),
    Placeholder(PlaceholderReason),
}

/// Copies the pack's sprite to the active location, then publishes its grid config.
pub fn publish(store: &StoreHandle, meta: &PackMeta, probe: &dyn ImageProbe) -> Result<ActivePublication> {
    let source = store.asset_path(&meta.id, &meta.filename)?;
    let data = std::fs::read(&source)
        .io_context(|| format!("Failed to read sprite {}", source.display()))?;

    match probe.dimensions(&data) {
        Ok(actual) if actual != meta.expected_dimensions() => {
            warn!("Publishing {} with sprite {}x{}, config expects {}x{}; readers will show a placeholder",
                meta.id, actual.0, actual.1, meta.expected_dimensions().0, meta.expected_dimensions().1);
        }
        Err(e) => warn!("Publishing {} with undecodable sprite: {}", meta.id, e),
        Ok(_) => {}
    }

    let target = store.active_sprite_path();
    fs_ext::ensure_dir(store.root())?;
    fs_ext::write_atomic(&target, &data)?;
    debug!("Copied {} to {}", source.display(), target.display());

    let revision = digest::revision(&data);
    store.defaults().set_all(vec![
        (KEY_CFG, json!([meta.cols, meta.rows, meta.cell_w, meta.cell_h])),
        (KEY_FPS, json!(meta.fps)),
        (KEY_PACK_ID, json!(meta.id)),
        (KEY_SPRITE_FILENAME, json!(meta.filename)),
        (KEY_REVISION, json!(revision)),
    ])?;
    debug!("Published config for {}", meta.id);

    Ok(ActivePublication {
        sprite_asset_path: target,
        cols: meta.cols,
        rows: meta.rows,
        cell_w: meta.cell_w,
        cell_h: meta.cell_h,
        fps: meta.fps,
        pack_id: Some(meta.id.clone()),
        revision: Some(revision),
    })
}

/// Withdraws the publication: config first, sprite second.
pub fn retract(store: &StoreHandle) -> Result<()> {
    store.defaults().remove_all(&PUBLISHED_KEYS)?;
    fs_ext::remove_file_if_exists(&store.active_sprite_path())?;
    debug!("Retracted active publication");
    Ok(())
}

/// Reads the publication and checks it against the sprite on disk. Never fails.
pub fn read_active(store: &StoreHandle, probe: &dyn ImageProbe) -> ActiveSprite {
    let Some(publication) = read_publication(store) else {
        return ActiveSprite::Placeholder(PlaceholderReason::NotPublished);
    };
    ActiveSprite::from_file(publication, probe)
}

impl ActiveSprite {
    fn from_file(publication: ActivePublication, probe: &dyn ImageProbe) -> ActiveSprite {
        let path = &publication.sprite_asset_path;
        let data = match fs_ext::read_optional(path) {
            Ok(Some(data)) => data,
            Ok(None) => return ActiveSprite::Placeholder(PlaceholderReason::AssetMissing(path.clone())),
            Err(e) => return ActiveSprite::Placeholder(PlaceholderReason::BadImage(e.to_string())),
        };
        let actual = match probe.dimensions(&data) {
            Ok(actual) => actual,
            Err(e) => return ActiveSprite::Placeholder(PlaceholderReason::BadImage(e)),
        };
        let expected = publication.expected_dimensions();
        if actual != expected {
            return ActiveSprite::Placeholder(PlaceholderReason::SizeMismatch { actual, expected });
        }
        ActiveSprite::Ready(publication)
    }
}

/// Assembles the record from the shared key-value store, `None` when no valid config is present.
///
/// All keys come from a single read, so the fields always belong to the same publication.
pub fn read_publication(store: &StoreHandle) -> Option<ActivePublication> {
    let [cfg, fps, pack_id, revision] = <[Option<Value>; 4]>::try_from(
        store.defaults().get_many(&[KEY_CFG, KEY_FPS, KEY_PACK_ID, KEY_REVISION]),
    ).ok()?;
    let [cols, rows, cell_w, cell_h] = parse_config(&cfg?)?;
    let fps = fps
        .and_then(|v| v.as_f64())
        .filter(|fps| fps.is_finite() && *fps > 0.0)
        .unwrap_or(DEFAULT_FPS);
    let string = |value: Option<Value>| value.and_then(|v| v.as_str().map(str::to_string));

    Some(ActivePublication {
        sprite_asset_path: store.active_sprite_path(),
        cols,
        rows,
        cell_w,
        cell_h,
        fps,
        pack_id: string(pack_id),
        revision: string(revision),
    })
}

fn parse_config(value: &Value) -> Option<[u32; 4]> {
    let items = value.as_array()?;
    if items.len() != 4 {
        return None;
    }
    let mut out = [0u32; 4];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = u32::try_from(item.as_u64()?).ok().filter(|v| *v > 0)?;
    }
    Some(out)
}
