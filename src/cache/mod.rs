//! Master cache
//!
//! Lazily maps image keys to fully installed master machines.
//!
//! # Lookup Order
//!
//! | Step | Source | Result |
//! |------|--------|--------|
//! | 1 | In-memory map | Cached master, no further work |
//! | 2 | Substrate, by derived name | Discovered master (no recipe) |
//! | 3 | Registry recipe + build | Built master (with recipe) |
//!
//! Checking the substrate before building means a restarted process reuses
//! masters that already exist instead of provisioning them again.

mod master;
mod masters;

pub use master::{ImageKey, Master, MasterOrigin, Naming};
pub use masters::MasterCache;
