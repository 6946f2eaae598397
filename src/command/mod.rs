use petpack::{DefaultTransport, PackManager, PngProbe};

pub type Manager = PackManager<DefaultTransport, PngProbe>;

pub mod activate;
pub mod install;
pub mod list;
pub mod remove;
pub mod show;
pub mod verify;
