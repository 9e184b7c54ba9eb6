//! Configuration schema for packwright
//!
//! Configuration is stored at `~/.config/packwright/config.toml`

use crate::lifecycle::{DetectOverrides, ForcedDecision};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Build settings
    pub build: BuildConfig,

    /// Detect overrides
    pub detect: DetectConfig,

    /// Runtime install scripts
    pub installers: InstallersConfig,

    /// .NET SDK buildpack
    pub dotnet: DotnetConfig,

    /// npm buildpack
    pub npm: NpmConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Append build events to `<layers>/build-events.log`
    pub event_log: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            event_log: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Keep development tooling available at launch
    pub dev_mode: bool,

    /// Base image stack id, e.g. `google.22` or `google.min.22`
    pub stack_id: String,

    /// Layers directory; `<app>/.packwright/layers` when unset
    pub layers_dir: Option<PathBuf>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            dev_mode: false,
            stack_id: "google.22".to_string(),
            layers_dir: None,
        }
    }
}

/// Detect overrides, applied before any buildpack's own detect
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectConfig {
    /// Only buildpacks for this runtime opt in
    pub runtime: Option<String>,

    /// Per-buildpack forced decisions, keyed by buildpack id
    pub forced: BTreeMap<String, ForcedDecision>,
}

impl DetectConfig {
    pub fn overrides(&self) -> DetectOverrides {
        DetectOverrides {
            runtime: self.runtime.clone(),
            forced: self.forced.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallersConfig {
    /// Runtime name to install script, e.g. `dotnet-sdk = "/opt/install-dotnet.sh"`
    pub scripts: HashMap<String, PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DotnetConfig {
    /// SDK version used when the app has no global.json pin
    pub sdk_version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NpmConfig {
    /// Install production dependencies only
    pub production: bool,
}

impl Default for NpmConfig {
    fn default() -> Self {
        Self { production: true }
    }
}
