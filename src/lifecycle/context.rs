//! Detect and build contexts

use crate::error::PackResult;
use crate::install::{CommandRunner, Installer};
use crate::layer::{CacheDecision, Fingerprint, Layer, LayerFlags, LayerStore, FINGERPRINT_KEY};
use crate::lifecycle::report::BuildReport;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Read-only view of the application handed to `detect`
#[derive(Debug, Clone)]
pub struct DetectContext {
    pub app_dir: PathBuf,
    /// Environment the build was started with
    pub platform_env: BTreeMap<String, String>,
    pub stack_id: String,
}

impl DetectContext {
    /// Whether `name` exists directly in the app directory
    pub fn app_file_exists(&self, name: &str) -> bool {
        self.app_dir.join(name).exists()
    }
}

/// Work performed on a freshly cleared layer
#[async_trait]
pub trait LayerInstall: Send + Sync {
    /// Populate the layer directory and its environment scopes
    async fn install(&self, layer: &mut Layer) -> PackResult<()>;
}

/// Everything a buildpack's `build` may touch
pub struct BuildContext {
    pub buildpack: String,
    pub app_dir: PathBuf,
    /// Platform environment plus the build scopes of earlier buildpacks
    pub build_env: BTreeMap<String, String>,
    pub stack_id: String,
    pub dev_mode: bool,
    pub layers: LayerStore,
    pub report: BuildReport,
    pub installer: Arc<dyn Installer>,
    pub runner: Arc<dyn CommandRunner>,
}

impl BuildContext {
    pub fn app_dir(&self) -> &Path {
        &self.app_dir
    }

    /// Build `name` unless its persisted fingerprint equals `fingerprint`.
    ///
    /// On a hit neither the directory nor the record is touched. On a miss
    /// the layer is cleared, `install` runs, and only after it succeeds are
    /// the env scopes and the new fingerprint written. An install error is
    /// returned as is and leaves the previous record in place.
    pub async fn cached_layer(
        &mut self,
        name: &str,
        flags: LayerFlags,
        fingerprint: &Fingerprint,
        install: &dyn LayerInstall,
    ) -> PackResult<CacheDecision> {
        let layer = self.layers.acquire(name, flags).await?;

        if layer.cache_decision(fingerprint).is_hit() {
            self.report.cache_hit(name);
            return Ok(CacheDecision::Hit);
        }

        self.report
            .cache_miss(name, layer.metadata(FINGERPRINT_KEY));
        layer.clear().await?;
        install.install(layer).await?;
        layer.commit(fingerprint).await?;

        debug!("Layer {} committed with {}", name, fingerprint);
        Ok(CacheDecision::Miss)
    }
}
