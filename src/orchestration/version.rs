//! VirtualBox version handling
//!
//! The guest additions ISO is published per VirtualBox release, so the
//! configured (or reported) version selects which file to stage.

use crate::error::{MastersError, MastersResult};
use semver::Version;
use std::fmt;

const GUEST_ADDITIONS_BASE_URL: &str = "http://download.virtualbox.org/virtualbox";

/// A VirtualBox release version without build revision or distro suffix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstrateVersion(Version);

impl SubstrateVersion {
    /// Parse strings like `4.1.8r75467` or `7.0.14_Ubuntur161095`
    pub fn parse(raw: &str) -> MastersResult<Self> {
        let release = raw
            .trim()
            .split(['r', '_'])
            .next()
            .unwrap_or_default();

        Version::parse(release)
            .map(Self)
            .map_err(|e| MastersError::InvalidVersion {
                version: raw.to_string(),
                reason: e.to_string(),
            })
    }

    /// Guest additions ISO file name for this release
    pub fn guest_additions_file(&self) -> String {
        format!("VBoxGuestAdditions_{}.iso", self)
    }

    /// Download location of the guest additions ISO
    pub fn guest_additions_url(&self) -> String {
        format!(
            "{}/{}/{}",
            GUEST_ADDITIONS_BASE_URL,
            self,
            self.guest_additions_file()
        )
    }
}

impl fmt::Display for SubstrateVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
