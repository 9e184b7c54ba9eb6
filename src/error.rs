//! Error types for packwright
//!
//! All modules use `PackResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for packwright operations
pub type PackResult<T> = Result<T, PackError>;

/// Stable prefix of every capability mismatch message
pub const CAPABILITY_MISMATCH_PREFIX: &str = "capability mismatch: ";

/// All errors that can occur while detecting or building an application
#[derive(Error, Debug)]
pub enum PackError {
    // Detect errors
    #[error("detection failed for {buildpack}: {reason}")]
    Detection { buildpack: String, reason: String },

    #[error("unsupported version {version:?}: {reason}")]
    UnsupportedVersion { version: String, reason: String },

    #[error("no buildpack opted in: {}", reasons.join("; "))]
    NothingDetected { reasons: Vec<String> },

    // Layer errors
    #[error("creating layer {layer:?} at {path}: {source}")]
    LayerCreation {
        layer: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid layer name {name:?}: {reason}")]
    InvalidLayerName { name: String, reason: String },

    #[error("installing into layer {layer:?}: {reason}")]
    Installation { layer: String, reason: String },

    #[error("capability mismatch: {0}")]
    CapabilityMismatch(String),

    // Lifecycle errors
    #[error("buildpack {buildpack} cannot move from {from} to {to}")]
    InvalidTransition {
        buildpack: String,
        from: String,
        to: String,
    },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No installer configured for runtime {0:?}")]
    InstallerNotConfigured(String),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command execution error: {command}, output: {output}")]
    CommandExecution { command: String, output: String },

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

impl PackError {
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
    pub fn command_exec(command: impl Into<String>, output: impl Into<String>) -> Self {
        Self::CommandExecution {
            command: command.into(),
            output: output.into(),
        }
    }

    /// Create a detection error for a buildpack
    pub fn detection(buildpack: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Detection {
            buildpack: buildpack.into(),
            reason: reason.into(),
        }
    }

    /// Create an installation error for a layer
    pub fn installation(layer: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Installation {
            layer: layer.into(),
            reason: reason.into(),
        }
    }

    /// Errors raised while deciding whether a buildpack applies
    pub fn is_detection(&self) -> bool {
        matches!(
            self,
            Self::Detection { .. } | Self::UnsupportedVersion { .. } | Self::NothingDetected { .. }
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::NothingDetected { .. } => {
                Some("Set PACKWRIGHT_RUNTIME to force a runtime, or check the app directory")
            }
            Self::UnsupportedVersion { .. } => {
                Some("Use a plain MAJOR.MINOR.PATCH version without pre-release or build suffixes")
            }
            Self::InstallerNotConfigured(_) => {
                Some("Add the runtime under [installers.scripts] in config.toml")
            }
            Self::LayerCreation { .. } => Some("Check that the layers directory is writable"),
            _ => None,
        }
    }
}
