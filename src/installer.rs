use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{PackError, Result, ValidationWarning};
use crate::fetch::{ManifestFetcher, Transport};
use crate::image::ImageProbe;
use crate::index::{PackIndex, PackMeta};
use crate::manifest::DEFAULT_PREFERRED_SCALE;
use crate::publish::{self, ActivePublication};
use crate::store::{fs_ext, StoreHandle};
use crate::verify::{self, VerifyReport};

/// What to do with a sprite whose pixel size does not match its manifest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SizePolicy {
    #[default]
    Warn,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallOptions {
    pub preferred_scale: u8,
    pub size_policy: SizePolicy,
    pub activate_on_install: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            preferred_scale: DEFAULT_PREFERRED_SCALE,
            size_policy: SizePolicy::Warn,
            activate_on_install: false,
        }
    }
}

/// Result of installing a single pack.
#[derive(Debug, Clone, PartialEq)]
pub struct InstallOutcome {
    pub meta: PackMeta,
    /// Set when the sprite did not pass validation but was kept anyway.
    pub warning: Option<ValidationWarning>,
    /// Set when the pack was also activated.
    pub published: Option<ActivePublication>,
}

/// Installs, activates and removes packs in one shared store.
///
/// Every change to the index is a full load-modify-save cycle under `writer`, so two operations
/// from this process never lose each other's update. Other processes are not coordinated.
pub struct PackManager<T: Transport, P: ImageProbe> {
    store: StoreHandle,
    fetcher: ManifestFetcher<T>,
    probe: P,
    options: InstallOptions,
    writer: Mutex<()>,
}

impl<T: Transport, P: ImageProbe> PackManager<T, P> {
    pub fn new(store: StoreHandle, transport: T, probe: P, options: InstallOptions) -> Self {
        Self {
            store,
            fetcher: ManifestFetcher::new(transport),
            probe,
            options,
            writer: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    pub fn options(&self) -> &InstallOptions {
        &self.options
    }

    pub fn list(&self) -> PackIndex {
        PackIndex::load(&self.store)
    }

    /// Fetches a pack and records it in the index.
    ///
    /// Both downloads happen before anything is written. The sprite is then checked, and the
    /// directory, sprite, manifest and index entry are written under the writer lock, so a
    /// concurrent `remove` sees either none of the pack or all of it. Files go sprite first,
    /// manifest second, so a present `manifest.json` always has its sprite next to it. A rejected
    /// sprite leaves an earlier install of the same pack untouched.
    pub fn install(&self, manifest_url: &Url) -> Result<InstallOutcome> {
        info!("Installing pack from {}", manifest_url);
        let fetched = self.fetcher.fetch_manifest(manifest_url)?;
        let manifest = &fetched.manifest;
        let variant = manifest.select_variant(self.options.preferred_scale)
            .ok_or_else(|| PackError::Decode("variants must not be empty".to_string()))?;
        debug!("Selected @{}x variant {} for {}", variant.scale, variant.sprite, manifest.id);

        let pack_dir = self.store.directory_for(&manifest.id)?;
        let sprite_path = self.store.asset_path(&manifest.id, &variant.sprite)?;
        let manifest_path = self.store.manifest_path(&manifest.id)?;
        let sprite = self.fetcher.fetch_asset(manifest_url, &variant.sprite)?;

        let guard = self.lock();
        let warning = self.validate_sprite(&sprite, variant.expected_dimensions());
        if let Some(warning) = &warning {
            match self.options.size_policy {
                SizePolicy::Warn => warn!("Pack {}: {}", manifest.id, warning),
                SizePolicy::Reject => return Err(PackError::Validation(warning.clone())),
            }
        }

        fs_ext::ensure_dir(&pack_dir)?;
        fs_ext::write_atomic(&sprite_path, &sprite)?;
        fs_ext::write_atomic(&manifest_path, &fetched.raw)?;
        debug!("Wrote {} ({} bytes) and manifest to {}", variant.sprite, sprite.len(), pack_dir.display());

        let meta = PackMeta::from_variant(manifest, variant);
        let mut index = PackIndex::load(&self.store);
        index.upsert(meta.clone());
        index.save(&self.store)?;
        info!("Installed pack {} ({})", meta.id, meta.name);

        let published = if self.options.activate_on_install {
            Some(self.activate_locked(&guard, &meta.id)?)
        } else {
            None
        };

        Ok(InstallOutcome { meta, warning, published })
    }

    fn validate_sprite(&self, sprite: &[u8], expected: (u32, u32)) -> Option<ValidationWarning> {
        match self.probe.dimensions(sprite) {
            Ok(actual) if actual == expected => None,
            Ok(actual) => Some(ValidationWarning::SizeMismatch { actual, expected }),
            Err(reason) => Some(ValidationWarning::Undecodable(reason)),
        }
    }

    /// Publishes an installed pack and marks it active.
    ///
    /// Sprite copy, then config, then index: a reader that sees the new config or the new active
    /// id finds the matching sprite already in place.
    pub fn activate(&self, id: &str) -> Result<ActivePublication> {
        let guard = self.lock();
        self.activate_locked(&guard, id)
    }

    fn activate_locked(&self, _guard: &MutexGuard<'_, ()>, id: &str) -> Result<ActivePublication> {
        let mut index = PackIndex::load(&self.store);
        let meta = index.meta(id)
            .cloned()
            .ok_or_else(|| PackError::NotFound(id.to_string()))?;

        let published = publish::publish(&self.store, &meta, &self.probe)?;
        index.set_active(id)?;
        index.save(&self.store)?;
        info!("Activated pack {}", id);
        Ok(published)
    }

    /// Deletes a pack's files and index entry. Unknown ids are a no-op.
    ///
    /// When the pack was active its publication is withdrawn as well.
    pub fn remove(&self, id: &str) -> Result<()> {
        let pack_dir = self.store.directory_for(id)?;
        let _guard = self.lock();

        // manifest goes first so no reader sees a manifest whose sprite is already deleted
        fs_ext::remove_file_if_exists(&self.store.manifest_path(id)?)?;
        if fs_ext::remove_dir_if_exists(&pack_dir)? {
            debug!("Deleted {}", pack_dir.display());
        }

        let mut index = PackIndex::load(&self.store);
        let was_active = index.active_pack_id.as_deref() == Some(id);
        if !index.remove(id) {
            debug!("Pack {} was not installed", id);
            return Ok(());
        }
        index.save(&self.store)?;

        if was_active {
            publish::retract(&self.store)?;
        }
        info!("Removed pack {}", id);
        Ok(())
    }

    /// Compares the index with the files under `Packs/`, optionally deleting leftovers.
    pub fn verify(&self, prune: bool) -> Result<VerifyReport> {
        let _guard = self.lock();
        let index = PackIndex::load(&self.store);
        let mut report = verify::scan(&self.store, &index)?;
        if prune {
            verify::prune(&mut report)?;
        }
        Ok(report)
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        // the guard protects no data, a poisoned lock is still a valid lock
        self.writer.lock().unwrap_or_else(|e| e.into_inner())
    }
}
