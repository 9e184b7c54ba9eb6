//! Lifecycle orchestration
//!
//! Runs detect for every buildpack, then build for the ones that opted in,
//! in order. Each buildpack gets its own layers directory and sees the
//! build scopes contributed by the buildpacks before it.

use crate::environment::Scope;
use crate::error::{PackError, PackResult};
use crate::install::{CommandRunner, Installer};
use crate::layer::LayerStore;
use crate::lifecycle::buildpack::Buildpack;
use crate::lifecycle::context::{BuildContext, DetectContext};
use crate::lifecycle::events::{BuildEventLog, EVENT_LOG_FILE};
use crate::lifecycle::phase::{BuildpackRun, DetectOverrides, PhaseController};
use crate::lifecycle::report::BuildReport;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Where and how a build runs
#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    pub app_dir: PathBuf,
    pub layers_dir: PathBuf,
    pub stack_id: String,
    pub dev_mode: bool,
    pub platform_env: BTreeMap<String, String>,
    /// Append JSON lines to `<layers>/build-events.log`
    pub event_log: bool,
}

/// Phase a failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    Detect,
    Build,
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Detect => write!(f, "detect"),
            Self::Build => write!(f, "build"),
        }
    }
}

/// Why a build stopped
#[derive(Debug)]
pub struct BuildFailure {
    /// None when no single buildpack is to blame (nothing detected)
    pub buildpack: Option<String>,
    pub phase: LifecyclePhase,
    pub error: PackError,
}

/// Result of detect over every buildpack
#[derive(Debug)]
pub struct Detection {
    pub runs: Vec<BuildpackRun>,
    pub report: BuildReport,
}

impl Detection {
    pub fn opted_in(&self) -> impl Iterator<Item = &BuildpackRun> {
        self.runs.iter().filter(|run| run.opted_in())
    }
}

/// Everything a build produced, including a failure if there was one
#[derive(Debug)]
pub struct BuildOutcome {
    pub build_id: Uuid,
    pub runs: Vec<BuildpackRun>,
    pub report: BuildReport,
    /// Platform environment plus every build-type layer's scopes
    pub build_env: BTreeMap<String, String>,
    /// Environment the launched application would see
    pub launch_env: BTreeMap<String, String>,
    pub failure: Option<BuildFailure>,
}

impl BuildOutcome {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }

    pub fn error(&self) -> Option<&PackError> {
        self.failure.as_ref().map(|f| &f.error)
    }

    pub fn run(&self, buildpack: &str) -> Option<&BuildpackRun> {
        self.runs.iter().find(|run| run.id() == buildpack)
    }
}

pub struct Lifecycle {
    controller: PhaseController,
    settings: LifecycleSettings,
    installer: Arc<dyn Installer>,
    runner: Arc<dyn CommandRunner>,
}

impl Lifecycle {
    pub fn new(
        settings: LifecycleSettings,
        overrides: DetectOverrides,
        installer: Arc<dyn Installer>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            controller: PhaseController::new(overrides),
            settings,
            installer,
            runner,
        }
    }

    pub fn settings(&self) -> &LifecycleSettings {
        &self.settings
    }

    fn detect_context(&self) -> DetectContext {
        DetectContext {
            app_dir: self.settings.app_dir.clone(),
            platform_env: self.settings.platform_env.clone(),
            stack_id: self.settings.stack_id.clone(),
        }
    }

    /// Run detect only
    pub async fn detect(&self, buildpacks: &[Arc<dyn Buildpack>]) -> PackResult<Detection> {
        let mut report = BuildReport::new();
        let mut runs = Vec::with_capacity(buildpacks.len());
        let events = BuildEventLog::new(false, PathBuf::new(), Uuid::new_v4());

        self.detect_all(buildpacks, &mut runs, &mut report, &events)
            .await
            .map_err(|failure| failure.error)?;

        Ok(Detection { runs, report })
    }

    /// Detect every buildpack, then build the ones that opted in.
    ///
    /// Stops at the first failure; the returned outcome carries the error
    /// unmodified along with the buildpack and phase it came from.
    pub async fn run(&self, buildpacks: &[Arc<dyn Buildpack>]) -> BuildOutcome {
        let build_id = Uuid::new_v4();
        let events = BuildEventLog::new(
            self.settings.event_log,
            self.settings.layers_dir.join(EVENT_LOG_FILE),
            build_id,
        );
        info!("Starting build {}", build_id);

        let mut outcome = BuildOutcome {
            build_id,
            runs: Vec::with_capacity(buildpacks.len()),
            report: BuildReport::new(),
            build_env: self.settings.platform_env.clone(),
            launch_env: BTreeMap::new(),
            failure: None,
        };

        if let Err(failure) = self
            .detect_all(buildpacks, &mut outcome.runs, &mut outcome.report, &events)
            .await
        {
            self.fail(&mut outcome, failure, &events).await;
            return outcome;
        }

        for (index, buildpack) in buildpacks.iter().enumerate() {
            if !outcome.runs[index].opted_in() {
                continue;
            }

            let id = buildpack.id().to_string();
            let mut ctx = BuildContext {
                buildpack: id.clone(),
                app_dir: self.settings.app_dir.clone(),
                build_env: outcome.build_env.clone(),
                stack_id: self.settings.stack_id.clone(),
                dev_mode: self.settings.dev_mode,
                layers: LayerStore::new(self.settings.layers_dir.join(&id), self.settings.dev_mode),
                report: BuildReport::new(),
                installer: Arc::clone(&self.installer),
                runner: Arc::clone(&self.runner),
            };

            let result = self
                .controller
                .build(buildpack.as_ref(), &mut ctx, &mut outcome.runs[index])
                .await;

            let report = std::mem::take(&mut ctx.report);
            for (layer, counters) in report.cache_counters() {
                events
                    .log(
                        "cache",
                        &serde_json::json!({
                            "buildpack": id,
                            "layer": layer,
                            "hits": counters.hits,
                            "misses": counters.misses,
                        }),
                    )
                    .await;
            }
            outcome.report.merge(report);

            if let Err(error) = result {
                let failure = BuildFailure {
                    buildpack: Some(id),
                    phase: LifecyclePhase::Build,
                    error,
                };
                self.fail(&mut outcome, failure, &events).await;
                return outcome;
            }

            for layer in ctx.layers.layers() {
                let types = layer.types();
                if types.build {
                    outcome.build_env = layer.env().apply(Scope::Build, &outcome.build_env);
                }
                if types.launch {
                    outcome.launch_env = layer.env().apply(Scope::Launch, &outcome.launch_env);
                }
                debug!("{}: applied layer {} ({:?})", id, layer.name(), types);
            }
        }

        events
            .log(
                "build.succeeded",
                &serde_json::json!({ "buildpacks": &outcome.runs }),
            )
            .await;
        info!("Build {} succeeded", build_id);
        outcome
    }

    async fn detect_all(
        &self,
        buildpacks: &[Arc<dyn Buildpack>],
        runs: &mut Vec<BuildpackRun>,
        report: &mut BuildReport,
        events: &BuildEventLog,
    ) -> Result<(), BuildFailure> {
        let ctx = self.detect_context();

        for buildpack in buildpacks {
            let mut run = BuildpackRun::new(buildpack.id());
            let result = self
                .controller
                .detect(buildpack.as_ref(), &ctx, &mut run)
                .await;
            runs.push(run);

            match result {
                Ok(decision) => {
                    report.detect(buildpack.id(), &decision);
                    events
                        .log(
                            "detect",
                            &serde_json::json!({
                                "buildpack": buildpack.id(),
                                "result": decision,
                            }),
                        )
                        .await;
                }
                Err(error) => {
                    return Err(BuildFailure {
                        buildpack: Some(buildpack.id().to_string()),
                        phase: LifecyclePhase::Detect,
                        error,
                    })
                }
            }
        }

        if !runs.iter().any(BuildpackRun::opted_in) {
            let reasons = runs
                .iter()
                .map(|run| format!("{}: {}", run.id(), run.reason().unwrap_or("no decision")))
                .collect();
            return Err(BuildFailure {
                buildpack: None,
                phase: LifecyclePhase::Detect,
                error: PackError::NothingDetected { reasons },
            });
        }

        Ok(())
    }

    async fn fail(&self, outcome: &mut BuildOutcome, failure: BuildFailure, events: &BuildEventLog) {
        let text = match &failure.buildpack {
            Some(buildpack) => format!(
                "{} failed during {}: {}",
                buildpack, failure.phase, failure.error
            ),
            None => format!("{} failed: {}", failure.phase, failure.error),
        };
        outcome.report.failure(text);

        events
            .log(
                "build.failed",
                &serde_json::json!({
                    "buildpack": failure.buildpack,
                    "phase": failure.phase,
                    "error": failure.error.to_string(),
                }),
            )
            .await;
        outcome.failure = Some(failure);
    }
}
