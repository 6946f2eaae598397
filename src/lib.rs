//! Shared on-disk store for animated sprite packs.
//!
//! One process installs packs (manifest plus sprite sheet) into `Packs/<id>/`, keeps the
//! registry in `Packs/index.json` and publishes the active pack to a fixed sprite path and a
//! shared key-value store. Other processes only read. There is no lock between processes, so
//! every write is an atomic replace and multi-file updates are ordered so readers never see a
//! config or manifest pointing at a missing sprite.

pub mod digest;
pub mod error;
pub mod fetch;
pub mod image;
pub mod index;
pub mod installer;
pub mod manifest;
pub mod publish;
pub mod settings;
pub mod store;
pub mod verify;

pub use error::{PackError, Result, ValidationWarning};
pub use fetch::{DefaultTransport, Transport};
pub use image::{ImageProbe, PngProbe};
pub use index::{PackIndex, PackMeta};
pub use installer::{InstallOptions, InstallOutcome, PackManager, SizePolicy};
pub use manifest::{Manifest, Variant};
pub use publish::{read_active, ActivePublication, ActiveSprite, PlaceholderReason};
pub use store::StoreHandle;
