//! Command-line interface

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, LogFormat, OutputFormat};

use crate::config::{self, Config};
use crate::error::MastersResult;
use crate::registry::ImageRegistry;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Recipe file to use: the `--images` override, else the configured one
pub fn registry_path(override_path: Option<&Path>, config: &Config) -> PathBuf {
    override_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config::images_path(config))
}

/// Load the image registry, treating a missing file as empty.
///
/// Masters that already exist can still be discovered without recipes.
pub async fn load_registry(path: &Path) -> MastersResult<ImageRegistry> {
    if !path.exists() {
        warn!("Image recipe file {} not found; no images can be built", path.display());
        return Ok(ImageRegistry::default());
    }
    ImageRegistry::load(path).await
}
