use std::path::{Path, PathBuf};

use crate::error::{PackError, Result};
use crate::store::defaults::{JsonDefaults, KeyValueStore};

pub mod defaults;
pub mod fs_ext;

pub const PACKS_DIR_NAME: &str = "Packs";
pub const INDEX_FILE_NAME: &str = "index.json";
pub const MANIFEST_FILE_NAME: &str = "manifest.json";
pub const ACTIVE_SPRITE_FILE_NAME: &str = "current-sprite.png";
pub const DEFAULTS_FILE_NAME: &str = "defaults.json";
pub const SETTINGS_FILE_NAME: &str = "petpack.json";

const MAX_ID_LEN: usize = 128;

/// Everything needed to reach one shared store: its root directory and the shared key-value store.
///
/// Both the installing process and any reader build their own handle on the same root.
pub struct StoreHandle {
    root: PathBuf,
    defaults: Box<dyn KeyValueStore>,
}

impl StoreHandle {
    /// Handle with the default JSON-file backed key-value store under `root`.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let defaults = JsonDefaults::new(root.join(DEFAULTS_FILE_NAME));
        Self { root, defaults: Box::new(defaults) }
    }

    pub fn with_defaults(root: impl Into<PathBuf>, defaults: Box<dyn KeyValueStore>) -> Self {
        Self { root: root.into(), defaults }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn defaults(&self) -> &dyn KeyValueStore {
        self.defaults.as_ref()
    }

    pub fn packs_root(&self) -> PathBuf {
        self.root.join(PACKS_DIR_NAME)
    }

    pub fn index_path(&self) -> PathBuf {
        self.packs_root().join(INDEX_FILE_NAME)
    }

    pub fn active_sprite_path(&self) -> PathBuf {
        self.root.join(ACTIVE_SPRITE_FILE_NAME)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE_NAME)
    }

    /// Directory holding one pack. Pure path arithmetic; nothing is created.
    pub fn directory_for(&self, id: &str) -> Result<PathBuf> {
        validate_id(id)?;
        Ok(self.packs_root().join(id))
    }

    pub fn asset_path(&self, id: &str, filename: &str) -> Result<PathBuf> {
        validate_filename(filename)?;
        Ok(self.directory_for(id)?.join(filename))
    }

    pub fn manifest_path(&self, id: &str) -> Result<PathBuf> {
        Ok(self.directory_for(id)?.join(MANIFEST_FILE_NAME))
    }
}

/// Checks that a pack id maps to exactly one directory directly below `Packs/`.
pub fn validate_id(id: &str) -> Result<()> {
    let fail = |reason| Err(PackError::InvalidId { id: id.to_string(), reason });
    if id.is_empty() {
        return fail("empty");
    }
    if id.len() > MAX_ID_LEN {
        return fail("longer than 128 bytes");
    }
    if id.starts_with('.') {
        return fail("starts with '.'");
    }
    if id == INDEX_FILE_NAME {
        return fail("reserved name");
    }
    if !id.bytes().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-')) {
        return fail("only ASCII letters, digits, '.', '_' and '-' are allowed");
    }
    Ok(())
}

/// Checks that a sprite filename is a single plain entry inside a pack directory.
pub fn validate_filename(filename: &str) -> Result<()> {
    let fail = |reason| Err(PackError::InvalidFilename { filename: filename.to_string(), reason });
    if filename.is_empty() {
        return fail("empty");
    }
    if filename.contains(['/', '\\']) {
        return fail("must not contain path separators");
    }
    if filename.starts_with('.') {
        return fail("starts with '.'");
    }
    if filename == MANIFEST_FILE_NAME {
        return fail("reserved name");
    }
    if filename.contains('\0') {
        return fail("contains a NUL byte");
    }
    Ok(())
}
