//! Configuration schema for masters
//!
//! Configuration is stored at `~/.config/masters/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Placeholder in the key sequence replaced by the machine name
pub const HOSTNAME_PLACEHOLDER: &str = "HOSTNAME";

/// Placeholder in the key sequence replaced by the preseed URL
pub const PRECONFIGURATION_URL_PLACEHOLDER: &str = "PRECONFIGURATION_URL";

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Working and staging directories
    pub workspace: WorkspaceConfig,

    /// VirtualBox settings
    pub substrate: SubstrateConfig,

    /// Unattended installation settings
    pub install: InstallConfig,

    /// Machine naming rules
    pub naming: NamingConfig,

    /// Master networking
    pub network: NetworkConfig,
}

/// Working directory layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Directory holding master disks and the `isos` staging directory
    pub working_dir: Option<PathBuf>,

    /// Image recipe file (defaults to `<working_dir>/images.toml`)
    pub images: Option<PathBuf>,
}

/// VirtualBox settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubstrateConfig {
    /// VBoxManage binary
    pub vboxmanage: String,

    /// VirtualBox version (e.g. "4.1.8r75467"); queried when unset
    pub version: Option<String>,

    /// Seconds between power-state checks while an install runs
    pub install_poll_secs: u64,
}

impl Default for SubstrateConfig {
    fn default() -> Self {
        Self {
            vboxmanage: "VBoxManage".to_string(),
            version: None,
            install_poll_secs: 5,
        }
    }
}

/// Unattended installation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    /// Keys typed at the installer boot prompt
    pub key_sequence: String,

    /// URL the installer fetches its preseed from
    pub preconfiguration_url: String,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            key_sequence: "<Esc><Esc><Enter> /install/vmlinuz noapic \
                preseed/url=PRECONFIGURATION_URL debian-installer=en_US auto \
                locale=en_US kbd-chooser/method=us hostname=HOSTNAME fb=false \
                debconf/frontend=noninteractive keyboard-configuration/layout=USA \
                keyboard-configuration/variant=USA console-setup/ask_detect=false \
                initrd=/install/initrd.gz -- <Enter>"
                .to_string(),
            preconfiguration_url: "http://10.0.2.2:23232/preseed.cfg".to_string(),
        }
    }
}

/// Machine naming rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Prefix prepended to an image key to name its master machine
    pub image_prefix: String,

    /// Separator reserved for clone names; image keys may not contain it
    pub node_name_separator: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            image_prefix: "masters-image-".to_string(),
            node_name_separator: "-0x0-".to_string(),
        }
    }
}

/// Master networking
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Host port forwarded to the master's SSH port
    pub master_port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self { master_port: 2222 }
    }
}
