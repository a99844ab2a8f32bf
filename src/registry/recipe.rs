//! Build recipe parsing
//!
//! The recipe file is a TOML document with one `[[image]]` table per
//! buildable image.

use serde::Deserialize;

/// Everything needed to build one master
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BuildRecipe {
    /// Image key this recipe builds
    pub id: String,

    /// Human-readable name
    #[serde(default)]
    pub name: String,

    /// Free-form description
    #[serde(default)]
    pub description: String,

    /// Operating system family (e.g. "ubuntu")
    #[serde(default)]
    pub os_family: String,

    /// Operating system version (e.g. "11.04")
    #[serde(default)]
    pub os_version: String,

    /// Whether the guest is 64-bit
    #[serde(default)]
    pub os_64bit: bool,

    /// VirtualBox OS type id; empty lets VirtualBox pick
    #[serde(default)]
    pub os_type_id: String,

    /// Remote location of the install ISO
    pub iso: String,

    /// Preseed served to the installer while the master is built
    pub preseed_cfg: String,

    /// Overrides the configured installer key sequence
    #[serde(default)]
    pub keystroke_sequence: Option<String>,

    /// Credentials baked in by the preseed
    #[serde(default)]
    pub login: Option<LoginCredentials>,

    /// Primary disk settings
    #[serde(default)]
    pub disk: DiskSettings,
}

/// Guest login baked in by the preseed
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}

/// Primary disk settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DiskSettings {
    /// Disk size in MB
    pub size_mb: u64,

    /// Disk image format, also used as the file extension
    pub format: String,
}

impl Default for DiskSettings {
    fn default() -> Self {
        Self {
            size_mb: 8192,
            format: "vdi".to_string(),
        }
    }
}

/// Top-level recipe document
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RecipeDocument {
    #[serde(default, rename = "image")]
    pub images: Vec<BuildRecipe>,
}
