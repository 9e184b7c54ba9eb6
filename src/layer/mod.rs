//! Layer lifecycle
//!
//! A layer is a named directory under the layers root plus a persisted
//! record of its types and metadata. The record is the only thing that
//! vouches for the directory contents: it is written strictly after an
//! install succeeds, so a failed install leaves the previous record (or
//! none) behind and the next build rebuilds the layer.
//!
//! ```text
//! <layers>/sdk/            layer contents and env scopes
//! <layers>/sdk.toml        [types] + [metadata]
//! <layers>/sdk.building    present while an install is uncommitted
//! ```

pub mod cache;
pub mod fingerprint;
pub mod flags;
pub mod record;
pub mod store;

pub use cache::{CacheDecision, LayerState, FINGERPRINT_KEY};
pub use fingerprint::{Fingerprint, FingerprintBuilder};
pub use flags::{LayerFlags, LayerTypes};
pub use record::LayerRecord;
pub use store::LayerStore;

use crate::environment::{self, LayerEnv, Scope};
use crate::error::{PackError, PackResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// A layer acquired for the current build
#[derive(Debug)]
pub struct Layer {
    name: String,
    path: PathBuf,
    record_path: PathBuf,
    marker_path: PathBuf,
    flags: LayerFlags,
    types: LayerTypes,
    metadata: BTreeMap<String, String>,
    state: LayerState,
    env: LayerEnv,
}

impl Layer {
    /// Open (creating if needed) the layer directory and read what the previous build left
    pub(crate) async fn open(
        root: &Path,
        name: &str,
        flags: LayerFlags,
        dev_mode: bool,
    ) -> PackResult<Self> {
        let path = root.join(name);
        fs::create_dir_all(&path)
            .await
            .map_err(|e| PackError::LayerCreation {
                layer: name.to_string(),
                path: path.clone(),
                source: e,
            })?;

        let record_path = root.join(format!("{}.toml", name));
        let marker_path = root.join(format!("{}.building", name));

        let record = LayerRecord::load(&record_path).await;
        let state = if marker_path.exists() {
            LayerState::Building
        } else if record.is_some() {
            LayerState::Complete
        } else {
            LayerState::Fresh
        };

        let env = environment::read_layer_env(&path).await?;
        let metadata = record.map(|r| r.metadata).unwrap_or_default();

        debug!(
            "Opened layer {} ({}, {} metadata keys)",
            name,
            state,
            metadata.len()
        );

        Ok(Self {
            name: name.to_string(),
            path,
            record_path,
            marker_path,
            flags,
            types: flags.types(dev_mode),
            metadata,
            state,
            env,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn flags(&self) -> LayerFlags {
        self.flags
    }

    pub fn types(&self) -> LayerTypes {
        self.types
    }

    pub fn state(&self) -> LayerState {
        self.state
    }

    /// Value persisted under `key` by the last successful build
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub fn env(&self) -> &LayerEnv {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut LayerEnv {
        &mut self.env
    }

    /// Compare `current` with the fingerprint of the last successful install
    pub fn cache_decision(&self, current: &Fingerprint) -> CacheDecision {
        if self.state == LayerState::Complete && current.matches(self.metadata(FINGERPRINT_KEY)) {
            CacheDecision::Hit
        } else {
            CacheDecision::Miss
        }
    }

    /// Remove everything in the layer directory ahead of a fresh install.
    ///
    /// The record is left alone; a marker flags the directory as incomplete
    /// until [`Layer::commit`] succeeds.
    pub async fn clear(&mut self) -> PackResult<()> {
        fs::write(&self.marker_path, b"")
            .await
            .map_err(|e| PackError::io(format!("marking layer {} as building", self.name), e))?;

        let mut entries = fs::read_dir(&self.path)
            .await
            .map_err(|e| PackError::io(format!("reading layer {}", self.name), e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| PackError::io(format!("reading layer {}", self.name), e))?
        {
            let path = entry.path();
            let is_dir = entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            let removed = if is_dir {
                fs::remove_dir_all(&path).await
            } else {
                fs::remove_file(&path).await
            };
            removed.map_err(|e| PackError::io(format!("clearing {}", path.display()), e))?;
        }

        self.env = LayerEnv::new();
        self.state = LayerState::Building;
        debug!("Cleared layer {}", self.name);
        Ok(())
    }

    /// Persist `key = value` into the layer record
    pub async fn write_metadata(&mut self, key: &str, value: &str) -> PackResult<()> {
        self.metadata.insert(key.to_string(), value.to_string());
        let record = LayerRecord {
            types: self.types,
            metadata: self.metadata.clone(),
        };
        record.save(&self.record_path).await
    }

    /// Finish an install: write the env scopes, then the fingerprint, then drop the marker
    pub async fn commit(&mut self, fingerprint: &Fingerprint) -> PackResult<()> {
        if !self.types.launch && !self.env.scope(Scope::Launch).is_empty() {
            return Err(PackError::installation(
                &self.name,
                "launch environment set on a layer that is not available at launch",
            ));
        }

        environment::write_layer_env(&self.path, &self.env).await?;
        self.write_metadata(FINGERPRINT_KEY, fingerprint.as_str())
            .await?;

        match fs::remove_file(&self.marker_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(PackError::io(
                    format!("unmarking layer {}", self.name),
                    e,
                ))
            }
        }

        self.state = LayerState::Complete;
        Ok(())
    }
}
