use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{PackError, Result};
use crate::manifest::{Manifest, Variant};
use crate::store::{fs_ext, StoreHandle};

/// Installed pack, flattened to the variant that was chosen at install time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackMeta {
    pub id: String,
    pub name: String,
    pub filename: String,
    pub cols: u32,
    pub rows: u32,
    pub cell_w: u32,
    pub cell_h: u32,
    pub scale: u8,
    pub fps: f64,
}

impl PackMeta {
    pub fn from_variant(manifest: &Manifest, variant: &Variant) -> Self {
        Self {
            id: manifest.id.clone(),
            name: manifest.name.clone(),
            filename: variant.sprite.clone(),
            cols: variant.cols,
            rows: variant.rows,
            cell_w: variant.cell_px.w,
            cell_h: variant.cell_px.h,
            scale: variant.scale,
            fps: manifest.fps,
        }
    }

    pub fn expected_dimensions(&self) -> (u32, u32) {
        (self.cols.saturating_mul(self.cell_w), self.rows.saturating_mul(self.cell_h))
    }
}

/// Registry of installed packs and the active one, stored as `Packs/index.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackIndex {
    #[serde(default)]
    pub installed: Vec<PackMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_pack_id: Option<String>,
}

impl PackIndex {
    /// Replaces the entry with the same id in place, or appends.
    pub fn upsert(&mut self, meta: PackMeta) {
        match self.installed.iter_mut().find(|m| m.id == meta.id) {
            Some(existing) => *existing = meta,
            None => self.installed.push(meta),
        }
    }

    /// Drops the entry and clears the active id if it pointed at it. Returns whether anything was removed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.installed.len();
        self.installed.retain(|m| m.id != id);
        if self.active_pack_id.as_deref() == Some(id) {
            self.active_pack_id = None;
        }
        self.installed.len() != before
    }

    pub fn meta(&self, id: &str) -> Option<&PackMeta> {
        self.installed.iter().find(|m| m.id == id)
    }

    pub fn active(&self) -> Option<&PackMeta> {
        self.active_pack_id.as_deref().and_then(|id| self.meta(id))
    }

    pub fn set_active(&mut self, id: &str) -> Result<()> {
        if self.meta(id).is_none() {
            return Err(PackError::NotFound(id.to_string()));
        }
        self.active_pack_id = Some(id.to_string());
        Ok(())
    }

    /// Repairs documents written by other processes: duplicate ids keep the first entry,
    /// an active id without an entry is cleared.
    fn normalize(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.installed.retain(|m| seen.insert(m.id.clone()));
        if let Some(id) = &self.active_pack_id {
            if self.meta(id).is_none() {
                warn!("Index names active pack {:?} which is not installed, clearing it", id);
                self.active_pack_id = None;
            }
        }
    }

    /// Reads the index, falling back to an empty one when it is missing or unreadable.
    pub fn load(store: &StoreHandle) -> PackIndex {
        let path = store.index_path();
        let data = match fs_ext::read_optional(&path) {
            Ok(Some(data)) => data,
            Ok(None) => return PackIndex::default(),
            Err(e) => {
                warn!("Pack index unreadable, starting empty: {}", e);
                return PackIndex::default();
            }
        };
        match serde_json::from_slice::<PackIndex>(&data) {
            Ok(mut index) => {
                index.normalize();
                index
            }
            Err(e) => {
                warn!("Pack index at {} is corrupt, starting empty: {}", path.display(), e);
                PackIndex::default()
            }
        }
    }

    pub fn save(&self, store: &StoreHandle) -> Result<()> {
        fs_ext::ensure_dir(&store.packs_root())?;
        let data = serde_json::to_vec_pretty(self)
            .map_err(|e| PackError::Decode(format!("Failed to serialize pack index: {}", e)))?;
        fs_ext::write_atomic(&store.index_path(), &data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn meta(id: &str, cols: u32) -> PackMeta {
        PackMeta {
            id: id.to_string(),
            name: id.to_uppercase(),
            filename: "s.png".to_string(),
            cols,
            rows: 3,
            cell_w: 480,
            cell_h: 480,
            scale: 3,
            fps: 2.0,
        }
    }

    #[test]
    fn upsert_replaces_in_place() {
        let mut index = PackIndex::default();
        index.upsert(meta("a", 1));
        index.upsert(meta("b", 1));
        index.upsert(meta("a", 6));
        let ids: Vec<_> = index.installed.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(index.meta("a").unwrap().cols, 6);
    }

    #[test]
    fn removing_active_clears_it() {
        let mut index = PackIndex::default();
        index.upsert(meta("a", 1));
        index.upsert(meta("b", 1));
        index.set_active("a").unwrap();

        assert!(index.remove("b"));
        assert_eq!(index.active_pack_id.as_deref(), Some("a"));
        assert!(index.remove("a"));
        assert_eq!(index.active_pack_id, None);
        assert!(!index.remove("a"));
    }

    #[test]
    fn set_active_requires_entry() {
        let mut index = PackIndex::default();
        assert!(matches!(index.set_active("missing"), Err(PackError::NotFound(_))));
        assert_eq!(index.active_pack_id, None);
    }

    #[test]
    fn wire_format_uses_camel_case() {
        let mut index = PackIndex::default();
        index.upsert(meta("cube", 6));
        index.set_active("cube").unwrap();
        let json = serde_json::to_value(&index).unwrap();
        assert_eq!(json["activePackId"], "cube");
        assert_eq!(json["installed"][0]["cellW"], 480);

        let empty = serde_json::to_value(PackIndex::default()).unwrap();
        assert!(empty.get("activePackId").is_none());
    }

    #[test]
    fn load_save_and_corruption() {
        let dir = TempDir::new().unwrap();
        let store = StoreHandle::open(dir.path());
        assert_eq!(PackIndex::load(&store), PackIndex::default());

        let mut index = PackIndex::default();
        index.upsert(meta("cube", 6));
        index.save(&store).unwrap();
        assert_eq!(PackIndex::load(&store), index);

        std::fs::write(store.index_path(), b"\x00garbage").unwrap();
        assert_eq!(PackIndex::load(&store), PackIndex::default());
    }

    #[test]
    fn load_repairs_dangling_active_and_duplicates() {
        let dir = TempDir::new().unwrap();
        let store = StoreHandle::open(dir.path());
        std::fs::create_dir_all(store.packs_root()).unwrap();
        let doc = serde_json::json!({
            "installed": [meta("a", 1), meta("a", 2)],
            "activePackId": "gone"
        });
        std::fs::write(store.index_path(), serde_json::to_vec(&doc).unwrap()).unwrap();

        let index = PackIndex::load(&store);
        assert_eq!(index.installed, vec![meta("a", 1)]);
        assert_eq!(index.active_pack_id, None);
    }
}
