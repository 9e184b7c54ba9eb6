//! npm dependency buildpack
//!
//! Which install command and cleanup step are available depends on the npm
//! release in the build image; both are picked from capability tables.

use crate::capability::{parse_version, CapabilityTable};
use crate::environment::Scope;
use crate::error::{PackError, PackResult};
use crate::install::{tool_version, CommandRunner, CommandSpec};
use crate::layer::{Fingerprint, Layer, LayerFlags};
use crate::lifecycle::{BuildContext, Buildpack, DetectContext, DetectDecision, LayerInstall};
use async_trait::async_trait;
use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub const NPM_BUILDPACK_ID: &str = "nodejs-npm";
pub const NPM_MODULES_LAYER: &str = "npm_modules";

const PACKAGE_JSON: &str = "package.json";
const PACKAGE_LOCK: &str = "package-lock.json";

/// How dependencies are installed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NpmInstallCommand {
    /// Clean install strictly from the lockfile
    Ci,
    Install,
}

impl NpmInstallCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ci => "ci",
            Self::Install => "install",
        }
    }
}

impl fmt::Display for NpmInstallCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `npm ci` is usable from 5.7.1 on
pub fn npm_install_command_table() -> CapabilityTable<NpmInstallCommand> {
    CapabilityTable::new(NpmInstallCommand::Install).rule(Version::new(5, 7, 1), NpmInstallCommand::Ci)
}

/// `npm prune` works from 5.7.0 on
pub fn npm_prune_table() -> CapabilityTable<bool> {
    CapabilityTable::new(false).rule(Version::new(5, 7, 0), true)
}

pub fn npm_install_command(version: &str) -> PackResult<NpmInstallCommand> {
    npm_install_command_table().select_raw(version).copied()
}

pub fn supports_npm_prune(version: &str) -> PackResult<bool> {
    npm_prune_table().select_raw(version).copied()
}

#[derive(Debug, Default, Deserialize)]
struct PackageJson {
    #[serde(default)]
    engines: BTreeMap<String, serde_json::Value>,
}

/// The npm version requested through `engines.npm`, or empty
pub async fn requested_npm_version(app_dir: &Path) -> PackResult<String> {
    let path = app_dir.join(PACKAGE_JSON);
    let contents = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| PackError::io(format!("reading {}", path.display()), e))?;
    let package: PackageJson = serde_json::from_str(&contents)?;

    Ok(match package.engines.get("npm") {
        Some(serde_json::Value::String(v)) => v.clone(),
        _ => String::new(),
    })
}

/// An npm-style range from `engines.npm`
///
/// npm writes `||` alternatives of space separated comparators, hyphen
/// ranges like `6 - 8`, and bare versions meaning exactly that version.
/// Each alternative becomes one [`VersionReq`].
#[derive(Debug, Clone, PartialEq)]
pub struct NpmRange {
    alternatives: Vec<VersionReq>,
}

impl NpmRange {
    /// `None` for empty or unparseable requests such as `latest`
    pub fn parse(requested: &str) -> Option<Self> {
        if requested.trim().is_empty() {
            return None;
        }
        let alternatives = requested
            .split("||")
            .map(parse_alternative)
            .collect::<Option<Vec<_>>>()?;
        Some(Self { alternatives })
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }
}

fn is_operator(c: char) -> bool {
    matches!(c, '<' | '>' | '=' | '~' | '^')
}

fn parse_alternative(raw: &str) -> Option<VersionReq> {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    if let [low, "-", high] = tokens.as_slice() {
        let low = low.trim_start_matches('v');
        let high = high.trim_start_matches('v');
        return VersionReq::parse(&format!(">={}, <={}", low, high)).ok();
    }

    let mut comparators = Vec::new();
    let mut pending = String::new();
    for token in tokens {
        if token.chars().all(is_operator) {
            pending.push_str(token);
            continue;
        }
        let split = token.find(|c: char| !is_operator(c)).unwrap_or(0);
        let (op, version) = token.split_at(split);
        let op = format!("{}{}", pending, op);
        pending.clear();

        let version = version.trim_start_matches('v');
        let wildcard = version.contains(|c: char| matches!(c, 'x' | 'X' | '*'));
        let op = if op.is_empty() && !wildcard { "=".to_string() } else { op };
        comparators.push(format!("{}{}", op, version));
    }
    if !pending.is_empty() {
        return None;
    }
    if comparators.is_empty() {
        return Some(VersionReq::STAR);
    }
    VersionReq::parse(&comparators.join(", ")).ok()
}

/// Move `from` to `to`, copying when they sit on different filesystems
async fn move_dir(from: &Path, to: &Path) -> std::io::Result<()> {
    match tokio::fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(e) => {
            debug!("rename {} failed ({}), copying instead", from.display(), e);
            copy_dir(from, to).await?;
            tokio::fs::remove_dir_all(from).await
        }
    }
}

/// Recursive copy that recreates symlinks instead of following them
async fn copy_dir(from: &Path, to: &Path) -> std::io::Result<()> {
    let mut pending = vec![(from.to_path_buf(), to.to_path_buf())];
    while let Some((src, dst)) = pending.pop() {
        tokio::fs::create_dir_all(&dst).await?;
        let mut entries = tokio::fs::read_dir(&src).await?;
        while let Some(entry) = entries.next_entry().await? {
            let kind = entry.file_type().await?;
            let target = dst.join(entry.file_name());
            if kind.is_dir() {
                pending.push((entry.path(), target));
            } else if kind.is_symlink() {
                copy_link(&entry.path(), &target).await?;
            } else {
                tokio::fs::copy(entry.path(), &target).await?;
            }
        }
    }
    Ok(())
}

#[cfg(unix)]
async fn copy_link(link: &Path, target: &Path) -> std::io::Result<()> {
    let points_to = tokio::fs::read_link(link).await?;
    tokio::fs::symlink(points_to, target).await
}

#[cfg(not(unix))]
async fn copy_link(link: &Path, target: &Path) -> std::io::Result<()> {
    tokio::fs::copy(link, target).await.map(|_| ())
}

/// Installs production or full dependencies with the system npm
#[derive(Debug, Clone, Default)]
pub struct NpmBuildpack {
    production: bool,
}

impl NpmBuildpack {
    pub fn new(production: bool) -> Self {
        Self { production }
    }
}

struct NpmInstall {
    runner: Arc<dyn CommandRunner>,
    app_dir: PathBuf,
    build_env: BTreeMap<String, String>,
    command: NpmInstallCommand,
    production: bool,
    prune: bool,
}

#[async_trait]
impl LayerInstall for NpmInstall {
    async fn install(&self, layer: &mut Layer) -> PackResult<()> {
        let modules = layer.path().join("node_modules");
        let bin = modules.join(".bin");

        let mut spec = CommandSpec::new("npm", &self.app_dir)
            .envs(&self.build_env)
            .env("NODE_PATH", modules.display().to_string())
            .arg(self.command.as_str())
            .arg("--quiet");
        if self.production {
            spec = spec.env("NODE_ENV", "production");
        }
        self.runner.run(&spec).await?;

        if self.prune {
            let prune = CommandSpec::new("npm", &self.app_dir)
                .envs(&self.build_env)
                .arg("prune")
                .arg("--production");
            self.runner.run(&prune).await?;
        }

        let installed = self.app_dir.join("node_modules");
        if installed.is_dir() {
            move_dir(&installed, &modules).await.map_err(|e| {
                PackError::installation(
                    layer.name(),
                    format!("moving node_modules into the layer: {}", e),
                )
            })?;
        }

        let env = layer.env_mut();
        env.set_default(Scope::Shared, "NODE_PATH", modules.display().to_string());
        env.prepend(Scope::Shared, "PATH", ":", bin.display().to_string());
        Ok(())
    }
}

#[async_trait]
impl Buildpack for NpmBuildpack {
    fn id(&self) -> &str {
        NPM_BUILDPACK_ID
    }

    fn runtime(&self) -> &str {
        "nodejs"
    }

    async fn detect(&self, ctx: &DetectContext) -> PackResult<DetectDecision> {
        if ctx.app_file_exists(PACKAGE_JSON) {
            Ok(DetectDecision::opt_in("found package.json"))
        } else {
            Ok(DetectDecision::opt_out("package.json not found"))
        }
    }

    async fn build(&self, ctx: &mut BuildContext) -> PackResult<()> {
        let raw = tool_version(ctx.runner.as_ref(), "npm", ctx.app_dir()).await?;
        let version = parse_version(&raw)?;

        let requested = requested_npm_version(ctx.app_dir()).await?;
        match NpmRange::parse(&requested) {
            Some(range) if !range.matches(&version) => {
                return Err(PackError::CapabilityMismatch(format!(
                    "package.json requests npm {} but npm {} is installed",
                    requested, version
                )));
            }
            Some(_) => {}
            None if !requested.is_empty() => {
                debug!("ignoring unparseable engines.npm {:?}", requested);
            }
            None => {}
        }

        let command = *npm_install_command_table().select(&version);
        let prune_supported = *npm_prune_table().select(&version);
        let prune = self.production && command == NpmInstallCommand::Install && prune_supported;
        if self.production && command == NpmInstallCommand::Install && !prune_supported {
            ctx.report.advisory(format!(
                "npm {} does not support prune, devDependencies stay installed",
                version
            ));
        }

        let lockfile = ctx.app_dir().join(PACKAGE_LOCK);
        if !lockfile.exists() {
            ctx.report.advisory(format!(
                "{} not found, dependencies may be resolved differently",
                PACKAGE_LOCK
            ));
        }

        let fingerprint = Fingerprint::builder()
            .field("npm", &version)
            .field("command", command)
            .field("production", self.production)
            .field_digest("lock", &lockfile)?
            .build();
        debug!("npm_modules fingerprint: {}", fingerprint);

        let install = NpmInstall {
            runner: Arc::clone(&ctx.runner),
            app_dir: ctx.app_dir.clone(),
            build_env: ctx.build_env.clone(),
            command,
            production: self.production,
            prune,
        };

        let flags = LayerFlags::new().build().cache().launch();
        let decision = ctx
            .cached_layer(NPM_MODULES_LAYER, flags, &fingerprint, &install)
            .await?;
        info!("npm {} dependencies: {}", command, decision);
        Ok(())
    }
}
