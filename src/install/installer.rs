//! Toolchain installers

use crate::error::{PackError, PackResult};
use crate::install::runner::{CommandRunner, CommandSpec};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// What to place into a layer directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    /// Runtime name, e.g. `dotnet-sdk`
    pub runtime: String,
    pub version: String,
}

impl InstallRequest {
    pub fn new(runtime: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            runtime: runtime.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for InstallRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.runtime, self.version)
    }
}

/// Places toolchain content for a version into a target directory
#[async_trait]
pub trait Installer: Send + Sync {
    async fn install(&self, request: &InstallRequest, target: &Path) -> PackResult<()>;
}

/// Installs runtimes by running one configured shell script per runtime.
///
/// The script runs inside the target directory with `PACKWRIGHT_RUNTIME`,
/// `PACKWRIGHT_VERSION` and `PACKWRIGHT_LAYER_DIR` set.
pub struct ScriptInstaller {
    scripts: HashMap<String, PathBuf>,
    runner: Arc<dyn CommandRunner>,
}

impl ScriptInstaller {
    pub fn new(scripts: HashMap<String, PathBuf>, runner: Arc<dyn CommandRunner>) -> Self {
        Self { scripts, runner }
    }
}

#[async_trait]
impl Installer for ScriptInstaller {
    async fn install(&self, request: &InstallRequest, target: &Path) -> PackResult<()> {
        let script = self
            .scripts
            .get(&request.runtime)
            .ok_or_else(|| PackError::InstallerNotConfigured(request.runtime.clone()))?;

        let layer = target
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| target.display().to_string());

        if !script.is_file() {
            return Err(PackError::installation(
                layer,
                format!("install script {} not found", script.display()),
            ));
        }

        info!("Installing {} into {}", request, target.display());

        let spec = CommandSpec::new("sh", target)
            .arg(script.display().to_string())
            .env("PACKWRIGHT_RUNTIME", &request.runtime)
            .env("PACKWRIGHT_VERSION", &request.version)
            .env("PACKWRIGHT_LAYER_DIR", target.display().to_string());

        match self.runner.run(&spec).await {
            Ok(_) => Ok(()),
            Err(PackError::CommandExecution { output, .. }) => Err(PackError::installation(
                layer,
                format!("installing {} failed:\n{}", request, output),
            )),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::install::ProcessRunner;
    use tempfile::TempDir;

    fn installer_with(runtime: &str, script: PathBuf) -> ScriptInstaller {
        let mut scripts = HashMap::new();
        scripts.insert(runtime.to_string(), script);
        ScriptInstaller::new(scripts, Arc::new(ProcessRunner))
    }

    #[tokio::test]
    async fn runs_script_in_target() {
        let temp = TempDir::new().unwrap();
        let script = temp.path().join("install-sdk.sh");
        std::fs::write(
            &script,
            "echo \"$PACKWRIGHT_VERSION\" > \"$PACKWRIGHT_LAYER_DIR/VERSION\"\n",
        )
        .unwrap();
        let target = temp.path().join("sdk");
        std::fs::create_dir_all(&target).unwrap();

        installer_with("dotnet-sdk", script)
            .install(&InstallRequest::new("dotnet-sdk", "8.0.100"), &target)
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(target.join("VERSION")).unwrap().trim(),
            "8.0.100"
        );
    }

    #[tokio::test]
    async fn failing_script_is_installation_error() {
        let temp = TempDir::new().unwrap();
        let script = temp.path().join("install-sdk.sh");
        std::fs::write(&script, "echo 'version 9.9.9 not found' >&2\nexit 1\n").unwrap();
        let target = temp.path().join("sdk");
        std::fs::create_dir_all(&target).unwrap();

        let err = installer_with("dotnet-sdk", script)
            .install(&InstallRequest::new("dotnet-sdk", "9.9.9"), &target)
            .await
            .unwrap_err();

        match err {
            PackError::Installation { layer, reason } => {
                assert_eq!(layer, "sdk");
                assert!(reason.contains("version 9.9.9 not found"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn unknown_runtime_is_not_configured() {
        let temp = TempDir::new().unwrap();
        let installer = ScriptInstaller::new(HashMap::new(), Arc::new(ProcessRunner));
        let err = installer
            .install(&InstallRequest::new("ruby", "3.3.0"), temp.path())
            .await
            .unwrap_err();
        assert!(matches!(err, PackError::InstallerNotConfigured(ref rt) if rt == "ruby"));
    }
}
