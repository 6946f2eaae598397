use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use crate::error::{PackError, Result};
use crate::store;

pub const DEFAULT_PREFERRED_SCALE: u8 = 3;

/// Pack description as published next to its sprite sheets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub id: String,
    pub name: String,
    pub fps: f64,
    pub variants: Vec<Variant>,
}

/// One resolution of a pack's sprite sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub scale: u8,
    pub cols: u32,
    pub rows: u32,
    pub cell_px: CellSize,
    pub sprite: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSize {
    pub w: u32,
    pub h: u32,
}

impl Variant {
    /// Pixel size the sprite sheet must have: one cell per column and row.
    pub fn expected_dimensions(&self) -> (u32, u32) {
        (
            self.cols.saturating_mul(self.cell_px.w),
            self.rows.saturating_mul(self.cell_px.h),
        )
    }
}

impl Manifest {
    /// Decodes and validates a manifest document.
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        let manifest: Manifest = serde_json::from_slice(data)
            .map_err(|e| PackError::Decode(e.to_string()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<()> {
        store::validate_id(&self.id)?;
        if !self.fps.is_finite() || self.fps <= 0.0 {
            return Err(PackError::Decode(format!("fps must be a positive number, got {}", self.fps)));
        }
        if self.variants.is_empty() {
            return Err(PackError::Decode("variants must not be empty".to_string()));
        }
        for (i, variant) in self.variants.iter().enumerate() {
            if !(1..=3).contains(&variant.scale) {
                return Err(PackError::Decode(format!("variant {}: scale must be 1, 2 or 3, got {}", i, variant.scale)));
            }
            if variant.cols == 0 || variant.rows == 0 || variant.cell_px.w == 0 || variant.cell_px.h == 0 {
                return Err(PackError::Decode(format!("variant {}: grid and cell dimensions must be positive", i)));
            }
            store::validate_filename(&variant.sprite)?;
        }
        Ok(())
    }

    /// Picks the sprite sheet to install.
    ///
    /// The highest scale always wins. Among variants of that scale one at `preferred_scale` is
    /// taken first, then manifest order decides. Returns `None` only for an empty variant list.
    pub fn select_variant(&self, preferred_scale: u8) -> Option<&Variant> {
        self.variants.iter()
            .min_by_key(|v| (Reverse(v.scale), v.scale != preferred_scale))
    }
}
