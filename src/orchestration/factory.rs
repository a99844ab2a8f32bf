//! Wiring of the master cache from configuration
//!
//! Everything the cache needs is passed explicitly; this is the only place
//! concrete implementations are chosen.

use crate::artifact::{ArtifactFetcher, HttpTransfer};
use crate::cache::{MasterCache, Naming};
use crate::config::{self, Config, ConfigManager};
use crate::error::MastersResult;
use crate::orchestration::builder::{BuildSettings, MasterBuilder};
use crate::orchestration::vboxmanage::VBoxManage;
use crate::orchestration::version::SubstrateVersion;
use crate::preseed::PreseedServer;
use crate::registry::ImageRegistry;
use std::sync::Arc;
use tracing::debug;

/// Create the VirtualBox substrate described by the configuration
pub fn create_substrate(config: &Config) -> VBoxManage {
    VBoxManage::new(&config.substrate)
}

/// Resolve the VirtualBox version, asking VBoxManage when not configured
pub async fn resolve_version(config: &Config, vbox: &VBoxManage) -> MastersResult<SubstrateVersion> {
    let raw = match &config.substrate.version {
        Some(version) => version.clone(),
        None => {
            let reported = vbox.version().await?;
            debug!("VBoxManage reports version {}", reported);
            reported
        }
    };
    SubstrateVersion::parse(&raw)
}

/// Build the master builder: resolves the guest additions location and
/// prepares the working directories
pub async fn create_builder(config: &Config, vbox: Arc<VBoxManage>) -> MastersResult<MasterBuilder> {
    ConfigManager::ensure_working_dirs(config).await?;
    let version = resolve_version(config, &vbox).await?;

    let fetcher = Arc::new(ArtifactFetcher::new(
        config::isos_dir(config),
        Arc::new(HttpTransfer::new()),
    ));

    let settings = BuildSettings {
        working_dir: config::working_dir(config),
        key_sequence: config.install.key_sequence.clone(),
        preconfiguration_url: config.install.preconfiguration_url.clone(),
        master_port: config.network.master_port,
        guest_additions_url: version.guest_additions_url(),
    };

    Ok(MasterBuilder::new(vbox, fetcher, settings))
}

/// Build a master cache backed by VirtualBox, HTTP downloads and the
/// preseed server
pub async fn create_cache(config: &Config, registry: ImageRegistry) -> MastersResult<MasterCache> {
    let vbox = Arc::new(create_substrate(config));
    let builder = create_builder(config, vbox.clone()).await?;

    Ok(MasterCache::new(
        Arc::new(registry),
        vbox,
        builder,
        Arc::new(PreseedServer::new()),
        Naming::from(&config.naming),
        config.install.preconfiguration_url.clone(),
    ))
}
