//! Layer store for a single build
//!
//! Hands out layers by name. Acquiring the same name twice in one build
//! returns the same layer with the metadata read on first acquisition.

use crate::error::{PackError, PackResult};
use crate::layer::{Layer, LayerFlags};
use std::collections::btree_map::{BTreeMap, Entry};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Owner of every layer acquired during one build
#[derive(Debug)]
pub struct LayerStore {
    root: PathBuf,
    dev_mode: bool,
    layers: BTreeMap<String, Layer>,
}

impl LayerStore {
    pub fn new(root: impl Into<PathBuf>, dev_mode: bool) -> Self {
        Self {
            root: root.into(),
            dev_mode,
            layers: BTreeMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dev_mode(&self) -> bool {
        self.dev_mode
    }

    /// Acquire the layer `name`, creating its directory on first use.
    ///
    /// Fails with [`PackError::LayerCreation`] when the directory cannot be created.
    pub async fn acquire(&mut self, name: &str, flags: LayerFlags) -> PackResult<&mut Layer> {
        validate_layer_name(name)?;

        match self.layers.entry(name.to_string()) {
            Entry::Occupied(slot) => {
                let existing = slot.into_mut();
                if existing.flags() != flags {
                    warn!(
                        "Layer {} re-acquired with different flags; keeping {:?}",
                        name,
                        existing.flags()
                    );
                }
                Ok(existing)
            }
            Entry::Vacant(slot) => {
                let layer = Layer::open(&self.root, name, flags, self.dev_mode).await?;
                Ok(slot.insert(layer))
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Layer> {
        self.layers.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Layer> {
        self.layers.get_mut(name)
    }

    /// Layers acquired so far, ordered by name
    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.values()
    }
}

/// Validate that a layer name is safe (no path traversal, no special characters).
fn validate_layer_name(name: &str) -> PackResult<()> {
    let invalid = |reason: &str| PackError::InvalidLayerName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if name.contains('/') || name.contains('\\') || name.contains("..") || name.contains('\0') {
        return Err(invalid("must not contain path separators or '..'"));
    }
    // Only allow alphanumeric, hyphens, underscores
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(invalid(
            "must contain only alphanumeric characters, hyphens, or underscores",
        ));
    }
    Ok(())
}
