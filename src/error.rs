//! Error types for masters
//!
//! All modules use `MastersResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for masters operations
pub type MastersResult<T> = Result<T, MastersError>;

/// All errors that can occur while resolving or building masters
#[derive(Error, Debug)]
pub enum MastersError {
    // Key errors
    #[error("Invalid image key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    // Substrate errors
    #[error("VBoxManage not found. Install VirtualBox from https://www.virtualbox.org")]
    VBoxManageNotFound,

    #[error("Substrate error for machine {machine}: {reason}")]
    Substrate { machine: String, reason: String },

    #[error("Failed to build master {machine}: {source}")]
    Build {
        machine: String,
        #[source]
        source: Box<MastersError>,
    },

    #[error("Invalid substrate version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    // Artifact errors
    #[error("Cannot derive a file name from artifact location: {0}")]
    ArtifactLocation(String),

    #[error("Download failed: {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("Download of {url} finished but {path} does not exist")]
    DownloadIncomplete { url: String, path: PathBuf },

    // Preseed server errors
    #[error("Configuration server error: {0}")]
    ConfigServer(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid image registry at {path}: {reason}")]
    RegistryInvalid { path: PathBuf, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command execution error: {command}, stderr: {stderr}")]
    CommandExecution { command: String, stderr: String },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MastersError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a command execution error
    pub fn command_exec(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::CommandExecution {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    /// Wrap a substrate failure raised while creating a master
    pub fn build(machine: impl Into<String>, source: MastersError) -> Self {
        Self::Build {
            machine: machine.into(),
            source: Box::new(source),
        }
    }

    /// Create an invalid key error
    pub fn invalid_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Check if a later call may succeed where this one failed.
    ///
    /// A failed build leaves no cache entry, so the next `get` starts over.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Build { .. } | Self::Download { .. } | Self::ConfigServer(_)
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::VBoxManageNotFound => Some("Install VirtualBox or set substrate.vboxmanage"),
            Self::InvalidVersion { .. } => Some("Set substrate.version, e.g. \"7.0.14r161095\""),
            Self::ConfigServer(_) => {
                Some("Check that the port in install.preconfiguration_url is free")
            }
            Self::InvalidKey { .. } => Some("Run: masters images"),
            _ => None,
        }
    }
}
