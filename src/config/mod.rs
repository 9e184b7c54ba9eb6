//! Configuration file handling
//!
//! A missing file means defaults. A file that fails to parse is an error,
//! never silently replaced, because a dropped `[detect.forced]` table would
//! change which buildpacks run.

pub mod schema;

pub use schema::Config;

use crate::error::{PackError, PackResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Reads and writes one `config.toml`
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Use `explicit` (from `--config` or `PACKWRIGHT_CONFIG`), else
    /// `<config dir>/packwright/config.toml`
    pub fn locate(explicit: Option<PathBuf>) -> Self {
        let config_path = explicit.unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("packwright")
                .join("config.toml")
        });
        Self { config_path }
    }

    pub async fn load(&self) -> PackResult<Config> {
        let content = match fs::read_to_string(&self.config_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No config at {}, using defaults", self.config_path.display());
                return Ok(Config::default());
            }
            Err(e) => {
                return Err(PackError::io(
                    format!("reading config from {}", self.config_path.display()),
                    e,
                ))
            }
        };

        toml::from_str(&content).map_err(|e| PackError::ConfigInvalid {
            path: self.config_path.clone(),
            reason: e.to_string(),
        })
    }

    /// Write `config` whole, creating the parent directory
    pub async fn save(&self, config: &Config) -> PackResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PackError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        fs::write(&self.config_path, toml::to_string_pretty(config)?)
            .await
            .map_err(|e| {
                PackError::io(format!("writing config to {}", self.config_path.display()), e)
            })?;

        info!("Wrote {}", self.config_path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }
}
