//! Layer lifecycle flags

use serde::{Deserialize, Serialize};

/// Which phases may use a layer, declared once when the layer is acquired.
///
/// `launch_if_dev_mode` makes the layer launchable only for dev mode builds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayerFlags {
    pub build: bool,
    pub cache: bool,
    pub launch: bool,
    pub launch_if_dev_mode: bool,
}

impl LayerFlags {
    pub const fn new() -> Self {
        Self {
            build: false,
            cache: false,
            launch: false,
            launch_if_dev_mode: false,
        }
    }

    pub const fn build(mut self) -> Self {
        self.build = true;
        self
    }

    pub const fn cache(mut self) -> Self {
        self.cache = true;
        self
    }

    pub const fn launch(mut self) -> Self {
        self.launch = true;
        self
    }

    pub const fn launch_if_dev_mode(mut self) -> Self {
        self.launch_if_dev_mode = true;
        self
    }

    /// Resolve the flags into the types recorded for this build
    pub fn types(&self, dev_mode: bool) -> LayerTypes {
        LayerTypes {
            build: self.build,
            cache: self.cache,
            launch: self.launch || (self.launch_if_dev_mode && dev_mode),
        }
    }
}

/// Resolved layer types, persisted in the layer record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerTypes {
    pub build: bool,
    pub cache: bool,
    pub launch: bool,
}
