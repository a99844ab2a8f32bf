//! Virtualization substrate abstraction
//!
//! The cache only needs two operations from the hypervisor: look a machine
//! up by name, and create+install one from a full specification.

use crate::error::MastersResult;
use crate::orchestration::spec::MasterSpec;
use async_trait::async_trait;
use std::fmt;

/// Handle to a machine registered with the substrate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineHandle {
    /// Substrate-assigned machine id
    pub id: String,
    /// Registered machine name
    pub name: String,
}

impl fmt::Display for MachineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Outcome of looking a machine up by name
#[derive(Debug)]
pub enum MachineLookup {
    /// The machine exists
    Found(MachineHandle),
    /// The substrate positively reports no such machine
    NotFound,
    /// Any other failure; the machine may or may not exist
    Failed(String),
}

/// Virtualization substrate used to find and create masters
#[async_trait]
pub trait Substrate: Send + Sync {
    /// Look up a machine by its exact name
    async fn find_machine(&self, name: &str) -> MachineLookup;

    /// Create the machine described by `spec` and run its installation.
    ///
    /// Blocks until the install has finished.
    async fn create_and_install(&self, spec: &MasterSpec) -> MastersResult<MachineHandle>;

    /// Human-readable substrate name for display
    fn substrate_name(&self) -> &'static str;
}
