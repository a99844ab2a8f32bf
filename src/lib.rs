//! Masters - build-once cache of VirtualBox master images
//!
//! Resolves image keys to fully installed template VMs. A master is looked
//! up in VirtualBox first and only built (ISO download, unattended install
//! driven by a short-lived preseed server) when it does not exist yet.

pub mod artifact;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod orchestration;
pub mod preseed;
pub mod registry;
pub mod ui;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{MastersError, MastersResult};
