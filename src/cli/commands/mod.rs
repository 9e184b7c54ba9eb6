//! CLI command implementations

pub mod build;
pub mod config;
pub mod detect;
pub mod select;

pub use build::execute as build;
pub use config::execute as config;
pub use detect::execute as detect;
pub use select::execute as select;

use crate::cli::args::DetectArgs;
use crate::config::Config;
use crate::error::{PackError, PackResult};
use crate::install::{CommandRunner, ProcessRunner, ScriptInstaller};
use crate::lifecycle::{Lifecycle, LifecycleSettings};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Build a lifecycle from the merged configuration.
///
/// This is the only place the process environment is read.
fn lifecycle(
    args: &DetectArgs,
    config: &Config,
    layers: Option<PathBuf>,
    dev_mode: Option<bool>,
) -> PackResult<Lifecycle> {
    let settings = settings(args, config, layers, dev_mode, std::env::vars().collect())?;

    let mut overrides = config.detect.overrides();
    if let Some(runtime) = &args.runtime {
        overrides.runtime = Some(runtime.clone());
    }

    let runner: Arc<dyn CommandRunner> = Arc::new(ProcessRunner);
    let installer = Arc::new(ScriptInstaller::new(
        config.installers.scripts.clone(),
        Arc::clone(&runner),
    ));

    Ok(Lifecycle::new(settings, overrides, installer, runner))
}

/// Flags and `PACKWRIGHT_*` variables (already folded into `args` by clap)
/// win over the config file
fn settings(
    args: &DetectArgs,
    config: &Config,
    layers: Option<PathBuf>,
    dev_mode: Option<bool>,
    platform_env: BTreeMap<String, String>,
) -> PackResult<LifecycleSettings> {
    let app_dir = absolute(&args.app)?;
    let layers_dir = layers
        .or_else(|| config.build.layers_dir.clone())
        .unwrap_or_else(|| app_dir.join(".packwright").join("layers"));

    Ok(LifecycleSettings {
        app_dir,
        layers_dir,
        stack_id: args
            .stack_id
            .clone()
            .unwrap_or_else(|| config.build.stack_id.clone()),
        dev_mode: dev_mode.unwrap_or(config.build.dev_mode),
        platform_env,
        event_log: config.general.event_log,
    })
}

fn absolute(path: &Path) -> PackResult<PathBuf> {
    if !path.is_dir() {
        return Err(PackError::PathNotFound(path.to_path_buf()));
    }
    std::fs::canonicalize(path)
        .map_err(|e| PackError::io(format!("resolving {}", path.display()), e))
}
