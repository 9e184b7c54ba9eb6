//! Persisted layer record
//!
//! Stored next to the layer directory as `<layers>/<name>.toml`:
//!
//! ```toml
//! [types]
//! build = true
//! cache = true
//! launch = false
//!
//! [metadata]
//! version = "version:8.0.100,devMode:false"
//! ```

use crate::error::{PackError, PackResult};
use crate::layer::flags::LayerTypes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerRecord {
    pub types: LayerTypes,
    pub metadata: BTreeMap<String, String>,
}

impl LayerRecord {
    /// Read a record left by a previous build.
    ///
    /// A missing record is `None`. An unreadable record is also `None`: it
    /// cannot vouch for the layer contents, so the layer is rebuilt.
    pub async fn load(path: &Path) -> Option<Self> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Ignoring unreadable layer record {}: {}", path.display(), e);
                return None;
            }
        };

        match toml::from_str(&content) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Ignoring malformed layer record {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Write the record through a temp file so readers never see a partial record
    pub async fn save(&self, path: &Path) -> PackResult<()> {
        let content = toml::to_string_pretty(self)?;
        let tmp = path.with_extension("toml.tmp");

        fs::write(&tmp, content)
            .await
            .map_err(|e| PackError::io(format!("writing {}", tmp.display()), e))?;
        fs::rename(&tmp, path)
            .await
            .map_err(|e| PackError::io(format!("renaming {}", tmp.display()), e))?;

        Ok(())
    }
}
