use std::fmt;
use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PackError>;

#[derive(Debug, Error)]
pub enum PackError {
    #[error("Failed to fetch {url}: {reason}")]
    Transport { url: String, reason: String },
    #[error("Invalid manifest: {0}")]
    Decode(String),
    #[error("Invalid pack id {id:?}: {reason}")]
    InvalidId { id: String, reason: &'static str },
    #[error("Invalid sprite filename {filename:?}: {reason}")]
    InvalidFilename { filename: String, reason: &'static str },
    #[error("Sprite rejected: {0}")]
    Validation(ValidationWarning),
    #[error("Pack not found: {0}")]
    NotFound(String),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl PackError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        PackError::Io { context: context.into(), source }
    }
}

/// Problem found while checking a written sprite against its manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationWarning {
    SizeMismatch {
        actual: (u32, u32),
        expected: (u32, u32),
    },
    Undecodable(String),
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationWarning::SizeMismatch { actual, expected } => write!(
                f,
                "size mismatch: image is {}x{}, expected {}x{}",
                actual.0, actual.1, expected.0, expected.1
            ),
            ValidationWarning::Undecodable(reason) => write!(f, "could not decode image: {}", reason),
        }
    }
}

/// Attaches a context message to io errors, like `anyhow::Context` does for the CLI.
pub trait IoContext<T> {
    fn io_context<C: Into<String>>(self, context: impl FnOnce() -> C) -> Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn io_context<C: Into<String>>(self, context: impl FnOnce() -> C) -> Result<T> {
        self.map_err(|e| PackError::io(context(), e))
    }
}
