//! Buildpack lifecycle: detect, build, report

pub mod buildpack;
pub mod context;
pub mod events;
pub mod orchestrator;
pub mod phase;
pub mod report;

pub use buildpack::{Buildpack, DetectDecision};
pub use context::{BuildContext, DetectContext, LayerInstall};
pub use events::{BuildEventLog, EVENT_LOG_FILE};
pub use orchestrator::{
    BuildFailure, BuildOutcome, Detection, Lifecycle, LifecyclePhase, LifecycleSettings,
};
pub use phase::{BuildpackRun, DetectOverrides, ForcedDecision, PhaseController, PhaseState, RUNTIME_ENV};
pub use report::{BuildReport, CacheCounters, LineKind, ReportLine};
