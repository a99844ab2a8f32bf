//! Master entities and naming rules

use crate::config::schema::NamingConfig;
use crate::error::{MastersError, MastersResult};
use crate::orchestration::MachineHandle;
use crate::registry::BuildRecipe;
use chrono::{DateTime, Utc};
use std::fmt;

/// Logical image identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageKey(String);

impl ImageKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for ImageKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// How a master came to be cached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterOrigin {
    /// Already registered with the substrate
    Discovered,
    /// Built by this process
    Built,
}

impl fmt::Display for MasterOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discovered => write!(f, "discovered"),
            Self::Built => write!(f, "built"),
        }
    }
}

/// A provisioned template machine for one image
#[derive(Debug, Clone)]
pub struct Master {
    key: ImageKey,
    machine: MachineHandle,
    recipe: Option<BuildRecipe>,
    acquired_at: DateTime<Utc>,
}

impl Master {
    /// Wrap a machine that already existed in the substrate
    pub fn discovered(key: ImageKey, machine: MachineHandle) -> Self {
        Self {
            key,
            machine,
            recipe: None,
            acquired_at: Utc::now(),
        }
    }

    /// Wrap a machine built from `recipe`
    pub fn built(key: ImageKey, machine: MachineHandle, recipe: BuildRecipe) -> Self {
        Self {
            key,
            machine,
            recipe: Some(recipe),
            acquired_at: Utc::now(),
        }
    }

    pub fn key(&self) -> &ImageKey {
        &self.key
    }

    pub fn machine(&self) -> &MachineHandle {
        &self.machine
    }

    /// Recipe the master was built from; `None` when discovered
    pub fn recipe(&self) -> Option<&BuildRecipe> {
        self.recipe.as_ref()
    }

    pub fn acquired_at(&self) -> DateTime<Utc> {
        self.acquired_at
    }

    pub fn origin(&self) -> MasterOrigin {
        match self.recipe {
            Some(_) => MasterOrigin::Built,
            None => MasterOrigin::Discovered,
        }
    }
}

/// Derives substrate machine names from image keys
#[derive(Debug, Clone)]
pub struct Naming {
    pub image_prefix: String,
    pub separator: String,
}

impl Naming {
    /// Reject keys that could collide with derived clone names
    pub fn validate(&self, key: &ImageKey) -> MastersResult<()> {
        if key.as_str().is_empty() {
            return Err(MastersError::invalid_key(key.as_str(), "image key is empty"));
        }
        if !self.separator.is_empty() && key.as_str().contains(&self.separator) {
            return Err(MastersError::invalid_key(
                key.as_str(),
                format!("master image names cannot contain \"{}\"", self.separator),
            ));
        }
        Ok(())
    }

    /// Substrate machine name for a master
    pub fn machine_name(&self, key: &ImageKey) -> String {
        format!("{}{}", self.image_prefix, key)
    }
}

impl From<&NamingConfig> for Naming {
    fn from(config: &NamingConfig) -> Self {
        Self {
            image_prefix: config.image_prefix.clone(),
            separator: config.node_name_separator.clone(),
        }
    }
}
