//! Artifact staging
//!
//! Mirrors remote install artifacts (ISOs) into a local staging directory.
//! A staged artifact is keyed by the final path segment of its remote
//! location; the presence of that file is the only cache signal.

mod http;

pub use http::HttpTransfer;

use crate::error::{MastersError, MastersResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};
use ureq::http::Uri;

/// Moves a remote resource to a local file
#[async_trait]
pub trait ArtifactTransfer: Send + Sync {
    /// Download `url` into `destination`, returning the written path
    async fn fetch(&self, url: &str, destination: &Path) -> MastersResult<PathBuf>;
}

/// Derive the staged file name from a remote location.
///
/// Query strings and fragments are ignored; the URL must have a path whose
/// last segment is a plain file name.
pub fn file_name_for(url: &str) -> MastersResult<String> {
    let invalid = || MastersError::ArtifactLocation(url.to_string());
    let without_fragment = url.split('#').next().unwrap_or_default();
    let uri: Uri = without_fragment.parse().map_err(|_| invalid())?;

    let path = uri.path();
    if path.is_empty() || path == "/" {
        return Err(invalid());
    }
    let name = path.rsplit('/').next().unwrap_or_default();

    if name.is_empty() || name == "." || name == ".." || name.contains('\\') {
        return Err(invalid());
    }
    Ok(name.to_string())
}

/// Ensures remote artifacts exist in the staging directory.
///
/// Check-then-download runs under an internal lock, so the fetcher is safe
/// to share between callers outside the master cache.
pub struct ArtifactFetcher {
    staging_dir: PathBuf,
    transfer: Arc<dyn ArtifactTransfer>,
    staging: Mutex<()>,
}

impl ArtifactFetcher {
    pub fn new(staging_dir: impl Into<PathBuf>, transfer: Arc<dyn ArtifactTransfer>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            transfer,
            staging: Mutex::new(()),
        }
    }

    /// Staging directory artifacts are placed in
    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Local path an artifact would be staged at
    pub fn local_path(&self, url: &str) -> MastersResult<PathBuf> {
        Ok(self.staging_dir.join(file_name_for(url)?))
    }

    /// Return the local path of `url`, downloading it first if needed
    pub async fn ensure_local(&self, url: &str) -> MastersResult<PathBuf> {
        let local = self.local_path(url)?;
        let _guard = self.staging.lock().await;

        if local.exists() {
            debug!("Artifact already staged: {}", local.display());
            return Ok(local);
        }

        tokio::fs::create_dir_all(&self.staging_dir).await.map_err(|e| {
            MastersError::io(
                format!("creating staging directory {}", self.staging_dir.display()),
                e,
            )
        })?;

        info!("Artifact not staged, downloading: {}", url);
        self.transfer.fetch(url, &local).await?;

        if !local.exists() {
            return Err(MastersError::DownloadIncomplete {
                url: url.to_string(),
                path: local,
            });
        }

        Ok(local)
    }
}
