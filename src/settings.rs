use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PackError, Result};
use crate::installer::{InstallOptions, SizePolicy};
use crate::store::fs_ext;

/// Optional per-store defaults read from `petpack.json` in the store root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Settings {
    pub preferred_scale: Option<u8>,
    pub size_policy: Option<SizePolicy>,
    pub activate_on_install: Option<bool>,
}

impl Settings {
    /// A missing file means no overrides. A malformed one is an error: it was written by a person.
    pub fn load(path: &Path) -> Result<Settings> {
        let Some(data) = fs_ext::read_optional(path)? else {
            return Ok(Settings::default());
        };
        let settings: Settings = serde_json::from_slice(&data)
            .map_err(|e| PackError::Decode(format!("{}: {}", path.display(), e)))?;
        if let Some(scale) = settings.preferred_scale {
            if !(1..=3).contains(&scale) {
                return Err(PackError::Decode(format!("{}: preferredScale must be 1, 2 or 3", path.display())));
            }
        }
        Ok(settings)
    }

    pub fn apply(&self, mut options: InstallOptions) -> InstallOptions {
        if let Some(scale) = self.preferred_scale {
            options.preferred_scale = scale;
        }
        if let Some(policy) = self.size_policy {
            options.size_policy = policy;
        }
        if let Some(activate) = self.activate_on_install {
            options.activate_on_install = activate;
        }
        options
    }
}
