//! Fetching manifests and sprite sheets from wherever a pack is hosted.

use std::fs;

use tracing::debug;
use url::Url;

use crate::error::{PackError, Result};
use crate::manifest::Manifest;

/// Single-attempt byte transport. Retries are up to the caller.
pub trait Transport: Send + Sync {
    fn get(&self, url: &Url) -> Result<Vec<u8>>;
}

/// `http(s)` through a blocking reqwest client, `file` straight from disk.
pub struct DefaultTransport {
    client: reqwest::blocking::Client,
}

impl DefaultTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("petpack/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PackError::Transport { url: String::new(), reason: format!("failed to build client: {}", e) })?;
        Ok(Self { client })
    }

    fn get_http(&self, url: &Url) -> Result<Vec<u8>> {
        let fail = |reason: String| PackError::Transport { url: url.to_string(), reason };
        let response = self.client.get(url.clone())
            .send()
            .map_err(|e| fail(format!("request failed: {}", e)))?
            .error_for_status()
            .map_err(|e| fail(e.to_string()))?;
        let body = response.bytes()
            .map_err(|e| fail(format!("failed to read body: {}", e)))?;
        Ok(body.to_vec())
    }

    fn get_file(&self, url: &Url) -> Result<Vec<u8>> {
        let fail = |reason: String| PackError::Transport { url: url.to_string(), reason };
        let path = url.to_file_path()
            .map_err(|_| fail("not a local file path".to_string()))?;
        fs::read(&path).map_err(|e| fail(e.to_string()))
    }
}

impl Transport for DefaultTransport {
    fn get(&self, url: &Url) -> Result<Vec<u8>> {
        debug!("GET {}", url);
        match url.scheme() {
            "http" | "https" => self.get_http(url),
            "file" => self.get_file(url),
            other => Err(PackError::Transport {
                url: url.to_string(),
                reason: format!("unsupported scheme '{}'", other),
            }),
        }
    }
}

/// A decoded manifest together with the exact bytes it was decoded from.
#[derive(Debug, Clone)]
pub struct FetchedManifest {
    pub manifest: Manifest,
    pub raw: Vec<u8>,
}

pub struct ManifestFetcher<T: Transport> {
    transport: T,
}

impl<T: Transport> ManifestFetcher<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn fetch_manifest(&self, url: &Url) -> Result<FetchedManifest> {
        let raw = self.transport.get(url)?;
        let manifest = Manifest::from_slice(&raw)?;
        Ok(FetchedManifest { manifest, raw })
    }

    /// Fetches `filename` from the directory that contains `base`.
    pub fn fetch_asset(&self, base: &Url, filename: &str) -> Result<Vec<u8>> {
        let url = resolve_asset_url(base, filename)?;
        self.transport.get(&url)
    }
}

/// Replaces the last path segment of `base` with `filename`.
pub fn resolve_asset_url(base: &Url, filename: &str) -> Result<Url> {
    crate::store::validate_filename(filename)?;
    base.join(filename).map_err(|e| PackError::Transport {
        url: base.to_string(),
        reason: format!("cannot resolve '{}': {}", filename, e),
    })
}
