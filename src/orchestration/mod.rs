//! Orchestration of master machines
//!
//! Provides the substrate abstraction and everything needed to turn a
//! recipe into an installed machine:
//! - `Substrate`: find/create primitives of the hypervisor
//! - `VBoxManage`: VirtualBox implementation over the CLI
//! - `MasterBuilder`: recipe → spec → installed machine

mod builder;
mod factory;
pub mod spec;
mod substrate;
mod vboxmanage;
mod version;

pub use builder::{BuildSettings, MasterBuilder, StagedArtifacts, GUEST_SSH_PORT, MASTER_MEMORY_MB};
pub use factory::{create_builder, create_cache, create_substrate, resolve_version};
pub use spec::MasterSpec;
pub use substrate::{MachineHandle, MachineLookup, Substrate};
pub use vboxmanage::{parse_key_sequence, KeyStroke, VBoxManage};
pub use version::SubstrateVersion;
