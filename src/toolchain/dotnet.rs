//! .NET SDK buildpack

use crate::environment::Scope;
use crate::error::{PackError, PackResult};
use crate::install::{InstallRequest, Installer};
use crate::layer::{CacheDecision, Fingerprint, Layer, LayerFlags};
use crate::lifecycle::{BuildContext, Buildpack, DetectContext, DetectDecision, LayerInstall};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

pub const DOTNET_BUILDPACK_ID: &str = "dotnet-sdk";
pub const SDK_LAYER: &str = "sdk";

const PROJECT_EXTENSIONS: [&str; 4] = ["csproj", "fsproj", "vbproj", "sln"];
const GOOGLE_MIN_22: &str = "google.min.22";

/// Installs the .NET SDK into the `sdk` layer.
///
/// The SDK is a build-time tool; in dev mode it also stays available at
/// launch so the app can be rebuilt in place.
#[derive(Debug, Clone, Default)]
pub struct DotnetSdkBuildpack {
    default_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GlobalJson {
    #[serde(default)]
    sdk: Option<GlobalJsonSdk>,
}

#[derive(Debug, Deserialize)]
struct GlobalJsonSdk {
    #[serde(default)]
    version: Option<String>,
}

impl DotnetSdkBuildpack {
    pub fn new(default_version: Option<String>) -> Self {
        Self { default_version }
    }

    /// SDK version pinned by `global.json`, else the configured default
    pub async fn sdk_version(&self, app_dir: &Path) -> PackResult<String> {
        let path = app_dir.join("global.json");
        let pinned = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => {
                let global: GlobalJson = serde_json::from_str(&contents).map_err(|e| {
                    PackError::detection(DOTNET_BUILDPACK_ID, format!("parsing global.json: {}", e))
                })?;
                global.sdk.and_then(|sdk| sdk.version)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(PackError::io(format!("reading {}", path.display()), e)),
        };

        pinned
            .or_else(|| self.default_version.clone())
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                PackError::detection(
                    DOTNET_BUILDPACK_ID,
                    "no SDK version in global.json and no default configured",
                )
            })
    }
}

/// Names of the project files directly in `dir`, sorted
pub async fn project_files(dir: &Path) -> PackResult<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| PackError::io(format!("reading {}", dir.display()), e))?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| PackError::io(format!("reading {}", dir.display()), e))?
    {
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| PROJECT_EXTENSIONS.contains(&ext));
        if matches && path.is_file() {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                files.push(name.to_string());
            }
        }
    }

    files.sort();
    Ok(files)
}

struct SdkInstall {
    installer: Arc<dyn Installer>,
    version: String,
    stack_id: String,
    dev_mode: bool,
}

#[async_trait]
impl LayerInstall for SdkInstall {
    async fn install(&self, layer: &mut Layer) -> PackResult<()> {
        let request = InstallRequest::new(DOTNET_BUILDPACK_ID, &self.version);
        self.installer.install(&request, layer.path()).await?;

        let root = layer.path().display().to_string();
        let env = layer.env_mut();
        if self.stack_id == GOOGLE_MIN_22 {
            env.set_default(Scope::Build, "DOTNET_SYSTEM_GLOBALIZATION_INVARIANT", "true");
        }

        if self.dev_mode {
            // The full SDK is present at launch; no separate runtime layer
            env.set_default(Scope::Shared, "DOTNET_ROOT", root.clone());
            env.prepend(Scope::Shared, "PATH", ":", root);
            env.set_default(Scope::Launch, "DOTNET_RUNNING_IN_CONTAINER", "true");
        } else {
            env.set_default(Scope::Build, "DOTNET_ROOT", root.clone());
            env.prepend(Scope::Build, "PATH", ":", root);
        }
        Ok(())
    }
}

#[async_trait]
impl Buildpack for DotnetSdkBuildpack {
    fn id(&self) -> &str {
        DOTNET_BUILDPACK_ID
    }

    fn runtime(&self) -> &str {
        "dotnet"
    }

    async fn detect(&self, ctx: &DetectContext) -> PackResult<DetectDecision> {
        let files = project_files(&ctx.app_dir).await?;
        if files.is_empty() {
            return Ok(DetectDecision::opt_out("no project files or .dll files found"));
        }
        Ok(DetectDecision::opt_in(format!(
            "found project files: {}",
            files.join(", ")
        )))
    }

    async fn build(&self, ctx: &mut BuildContext) -> PackResult<()> {
        let version = self.sdk_version(ctx.app_dir()).await?;
        debug!("Using .NET SDK {} (dev mode: {})", version, ctx.dev_mode);

        let fingerprint = Fingerprint::builder()
            .field("version", &version)
            .field("devMode", ctx.dev_mode)
            .build();

        let install = SdkInstall {
            installer: Arc::clone(&ctx.installer),
            version,
            stack_id: ctx.stack_id.clone(),
            dev_mode: ctx.dev_mode,
        };

        let flags = LayerFlags::new().build().cache().launch_if_dev_mode();
        if ctx.cached_layer(SDK_LAYER, flags, &fingerprint, &install).await? == CacheDecision::Hit {
            ctx.report.info(".NET SDK cache hit, skipping installation.");
        }
        Ok(())
    }
}
