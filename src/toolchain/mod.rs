//! Toolchain buildpacks shipped with packwright

pub mod dotnet;
pub mod npm;

pub use dotnet::{DotnetSdkBuildpack, DOTNET_BUILDPACK_ID};
pub use npm::{
    npm_install_command, requested_npm_version, supports_npm_prune, NpmBuildpack,
    NpmInstallCommand, NPM_BUILDPACK_ID,
};

use crate::config::Config;
use crate::lifecycle::Buildpack;
use std::sync::Arc;

/// Buildpacks in detect/build order
pub fn default_buildpacks(config: &Config) -> Vec<Arc<dyn Buildpack>> {
    vec![
        Arc::new(DotnetSdkBuildpack::new(config.dotnet.sdk_version.clone())),
        Arc::new(NpmBuildpack::new(config.npm.production)),
    ]
}
