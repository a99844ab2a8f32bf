//! Machine specification types
//!
//! Plain data describing the hardware, storage and network layout of a
//! master. Built by [`MasterBuilder`](super::MasterBuilder) and consumed by
//! a [`Substrate`](super::Substrate).

use std::path::PathBuf;

/// Storage bus type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBus {
    Ide,
    Sata,
}

impl StorageBus {
    /// VBoxManage `storagectl --add` value
    pub fn as_arg(&self) -> &'static str {
        match self {
            Self::Ide => "ide",
            Self::Sata => "sata",
        }
    }
}

/// Hard disk attached to a controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardDisk {
    pub path: PathBuf,
    pub size_mb: u64,
    pub format: String,
    pub controller_port: u32,
    pub device_slot: u32,
    /// Delete the disk file together with the machine
    pub auto_delete: bool,
}

/// ISO image attached as a DVD drive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsoAttachment {
    pub controller_port: u32,
    pub device_slot: u32,
    pub path: PathBuf,
}

/// Storage controller with its attached media
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageController {
    pub name: String,
    pub bus: StorageBus,
    pub hard_disks: Vec<HardDisk>,
    pub isos: Vec<IsoAttachment>,
}

/// What to remove when a machine is unregistered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupMode {
    /// Unregister only
    UnregisterOnly,
    /// Unregister and delete all attached media
    Full,
}

/// Virtual machine hardware
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmSpec {
    pub id: String,
    pub name: String,
    pub os_type_id: String,
    pub memory_mb: u32,
    pub controllers: Vec<StorageController>,
    /// Replace a machine registered under the same name
    pub force_overwrite: bool,
    pub cleanup_mode: CleanupMode,
}

/// Network attachment of an adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkAttachment {
    Nat,
    HostOnly,
}

/// NAT port-forwarding rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectRule {
    pub protocol: String,
    pub host_ip: String,
    pub host_port: u16,
    pub guest_ip: String,
    pub guest_port: u16,
}

/// Network adapter configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkAdapter {
    pub attachment: NetworkAttachment,
    pub redirects: Vec<RedirectRule>,
}

/// Network interface card in a given slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInterfaceCard {
    pub slot: u32,
    pub adapter: NetworkAdapter,
}

/// All network interfaces of a machine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkSpec {
    pub nics: Vec<NetworkInterfaceCard>,
}

/// Install medium and the keys typed at its boot prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsoSpec {
    pub source_path: PathBuf,
    pub installation_script: String,
}

/// Full specification for creating and installing a master
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterSpec {
    pub vm: VmSpec,
    pub iso: IsoSpec,
    pub network: NetworkSpec,
    /// Preseed content served while the installer runs
    pub install_config: String,
}

impl MasterSpec {
    /// Every ISO path attached to the machine
    pub fn attached_isos(&self) -> impl Iterator<Item = &IsoAttachment> {
        self.vm.controllers.iter().flat_map(|c| c.isos.iter())
    }
}
