//! Master construction
//!
//! Turns a build recipe into a full [`MasterSpec`] and asks the substrate to
//! create and install it. The layout is fixed: one IDE controller carrying
//! the install ISO at (0,0), the primary disk at (0,1) and the guest
//! additions ISO at (1,0); one NAT adapter forwarding the master port to
//! the guest's SSH port.

use crate::artifact::ArtifactFetcher;
use crate::config::schema::{HOSTNAME_PLACEHOLDER, PRECONFIGURATION_URL_PLACEHOLDER};
use crate::error::{MastersError, MastersResult};
use crate::orchestration::spec::{
    CleanupMode, HardDisk, IsoAttachment, IsoSpec, MasterSpec, NetworkAdapter, NetworkAttachment,
    NetworkInterfaceCard, NetworkSpec, RedirectRule, StorageBus, StorageController, VmSpec,
};
use crate::orchestration::substrate::{MachineHandle, Substrate};
use crate::registry::BuildRecipe;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Memory given to every master
pub const MASTER_MEMORY_MB: u32 = 512;

/// Guest port the master port is forwarded to
pub const GUEST_SSH_PORT: u16 = 22;

/// Name of the single storage controller
pub const IDE_CONTROLLER: &str = "IDE Controller";

/// Settings shared by every build
#[derive(Debug, Clone)]
pub struct BuildSettings {
    /// Directory master disks are created in
    pub working_dir: PathBuf,
    /// Installer key sequence template
    pub key_sequence: String,
    /// URL the installer fetches its preseed from
    pub preconfiguration_url: String,
    /// Host port forwarded to the guest's SSH port
    pub master_port: u16,
    /// Remote location of the guest additions ISO
    pub guest_additions_url: String,
}

/// Local paths of the ISOs a build attaches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedArtifacts {
    pub install_iso: PathBuf,
    pub guest_additions_iso: PathBuf,
}

/// Builds masters from recipes
pub struct MasterBuilder {
    substrate: Arc<dyn Substrate>,
    fetcher: Arc<ArtifactFetcher>,
    settings: BuildSettings,
}

impl MasterBuilder {
    pub fn new(
        substrate: Arc<dyn Substrate>,
        fetcher: Arc<ArtifactFetcher>,
        settings: BuildSettings,
    ) -> Self {
        Self {
            substrate,
            fetcher,
            settings,
        }
    }

    pub fn settings(&self) -> &BuildSettings {
        &self.settings
    }

    /// Stage the guest additions and install ISOs
    pub async fn stage(&self, recipe: &BuildRecipe) -> MastersResult<StagedArtifacts> {
        let guest_additions_iso = self
            .fetcher
            .ensure_local(&self.settings.guest_additions_url)
            .await?;
        let install_iso = self.fetcher.ensure_local(&recipe.iso).await?;

        Ok(StagedArtifacts {
            install_iso,
            guest_additions_iso,
        })
    }

    /// Keys typed at the installer prompt for `machine_name`
    pub fn installation_script(&self, recipe: &BuildRecipe, machine_name: &str) -> String {
        recipe
            .keystroke_sequence
            .as_deref()
            .unwrap_or(&self.settings.key_sequence)
            .replace(HOSTNAME_PLACEHOLDER, machine_name)
            .replace(
                PRECONFIGURATION_URL_PLACEHOLDER,
                &self.settings.preconfiguration_url,
            )
    }

    /// Derive the full machine specification for a recipe
    pub fn master_spec(
        &self,
        recipe: &BuildRecipe,
        machine_name: &str,
        staged: &StagedArtifacts,
    ) -> MasterSpec {
        let disk_path = self
            .settings
            .working_dir
            .join(format!("{}.{}", machine_name, recipe.disk.format));

        let hard_disk = HardDisk {
            path: disk_path,
            size_mb: recipe.disk.size_mb,
            format: recipe.disk.format.clone(),
            controller_port: 0,
            device_slot: 1,
            auto_delete: true,
        };

        let ide_controller = StorageController {
            name: IDE_CONTROLLER.to_string(),
            bus: StorageBus::Ide,
            hard_disks: vec![hard_disk],
            isos: vec![
                IsoAttachment {
                    controller_port: 0,
                    device_slot: 0,
                    path: staged.install_iso.clone(),
                },
                IsoAttachment {
                    controller_port: 1,
                    device_slot: 0,
                    path: staged.guest_additions_iso.clone(),
                },
            ],
        };

        let vm = VmSpec {
            id: recipe.id.clone(),
            name: machine_name.to_string(),
            os_type_id: recipe.os_type_id.clone(),
            memory_mb: MASTER_MEMORY_MB,
            controllers: vec![ide_controller],
            force_overwrite: true,
            cleanup_mode: CleanupMode::Full,
        };

        let adapter = NetworkAdapter {
            attachment: NetworkAttachment::Nat,
            redirects: vec![RedirectRule {
                protocol: "tcp".to_string(),
                host_ip: "127.0.0.1".to_string(),
                host_port: self.settings.master_port,
                guest_ip: String::new(),
                guest_port: GUEST_SSH_PORT,
            }],
        };

        MasterSpec {
            vm,
            iso: IsoSpec {
                source_path: staged.install_iso.clone(),
                installation_script: self.installation_script(recipe, machine_name),
            },
            network: NetworkSpec {
                nics: vec![NetworkInterfaceCard { slot: 0, adapter }],
            },
            install_config: recipe.preseed_cfg.clone(),
        }
    }

    /// Stage artifacts, derive the spec, and create+install the machine.
    ///
    /// A substrate failure is terminal for this call; nothing is retried.
    pub async fn build(
        &self,
        recipe: &BuildRecipe,
        machine_name: &str,
    ) -> MastersResult<MachineHandle> {
        let staged = self.stage(recipe).await?;
        debug!(
            "Staged {} and {}",
            staged.install_iso.display(),
            staged.guest_additions_iso.display()
        );

        let spec = self.master_spec(recipe, machine_name, &staged);
        info!(
            "Creating master {} on {}",
            machine_name,
            self.substrate.substrate_name()
        );

        self.substrate
            .create_and_install(&spec)
            .await
            .map_err(|e| MastersError::build(machine_name, e))
    }
}
