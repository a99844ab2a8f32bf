//! HTTP artifact transfer

use super::ArtifactTransfer;
use crate::error::{MastersError, MastersResult};
use async_trait::async_trait;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Downloads artifacts over HTTP(S) with ureq.
///
/// The body is written to `<destination>.part` and renamed on success, so an
/// interrupted download never looks staged.
#[derive(Debug, Clone, Default)]
pub struct HttpTransfer;

impl HttpTransfer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ArtifactTransfer for HttpTransfer {
    async fn fetch(&self, url: &str, destination: &Path) -> MastersResult<PathBuf> {
        let url = url.to_string();
        let destination = destination.to_path_buf();

        tokio::task::spawn_blocking(move || download(&url, &destination))
            .await
            .map_err(|e| MastersError::Internal(format!("download task failed: {}", e)))?
    }
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

fn download(url: &str, destination: &Path) -> MastersResult<PathBuf> {
    let part = partial_path(destination);
    debug!("Downloading {} to {}", url, part.display());

    let mut response = ureq::get(url).call().map_err(|e| MastersError::Download {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let mut file = File::create(&part)
        .map_err(|e| MastersError::io(format!("creating {}", part.display()), e))?;
    let mut reader = response.body_mut().as_reader();
    let written = std::io::copy(&mut reader, &mut file).map_err(|e| {
        let _ = std::fs::remove_file(&part);
        MastersError::Download {
            url: url.to_string(),
            reason: e.to_string(),
        }
    })?;

    std::fs::rename(&part, destination).map_err(|e| {
        MastersError::io(
            format!("moving {} to {}", part.display(), destination.display()),
            e,
        )
    })?;

    info!("Downloaded {} ({} bytes)", url, written);
    Ok(destination.to_path_buf())
}
