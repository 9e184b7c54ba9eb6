//! Detect/build phase control
//!
//! Every buildpack moves through
//!
//! ```text
//! NotStarted -> Detecting -> OptedOut            (terminal)
//!                         -> OptedIn -> Building -> Succeeded (terminal)
//!                                               -> Failed    (terminal)
//!                         -> Failed                (detection error)
//! ```
//!
//! Overrides are plain values handed to the controller; nothing here reads
//! the process environment.

use crate::error::{PackError, PackResult};
use crate::lifecycle::buildpack::{Buildpack, DetectDecision};
use crate::lifecycle::context::{BuildContext, DetectContext};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Environment variable that force-selects a runtime
pub const RUNTIME_ENV: &str = "PACKWRIGHT_RUNTIME";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PhaseState {
    NotStarted,
    Detecting,
    OptedOut { reason: String },
    OptedIn { reason: String },
    Building,
    Succeeded,
    Failed { message: String },
}

impl PhaseState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::NotStarted => "not-started",
            Self::Detecting => "detecting",
            Self::OptedOut { .. } => "opted-out",
            Self::OptedIn { .. } => "opted-in",
            Self::Building => "building",
            Self::Succeeded => "succeeded",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::OptedOut { .. } | Self::Succeeded | Self::Failed { .. }
        )
    }
}

impl fmt::Display for PhaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Phase progress of one buildpack in one build
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildpackRun {
    id: String,
    state: PhaseState,
}

impl BuildpackRun {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: PhaseState::NotStarted,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> &PhaseState {
        &self.state
    }

    pub fn opted_in(&self) -> bool {
        matches!(self.state, PhaseState::OptedIn { .. })
    }

    /// Detect reason, once detect has decided
    pub fn reason(&self) -> Option<&str> {
        match &self.state {
            PhaseState::OptedIn { reason } | PhaseState::OptedOut { reason } => Some(reason),
            _ => None,
        }
    }

    fn transition(&mut self, next: PhaseState) -> PackResult<()> {
        use PhaseState::*;

        let allowed = matches!(
            (&self.state, &next),
            (NotStarted, Detecting)
                | (Detecting, OptedOut { .. })
                | (Detecting, OptedIn { .. })
                | (Detecting, Failed { .. })
                | (OptedIn { .. }, Building)
                | (Building, Succeeded)
                | (Building, Failed { .. })
        );

        if !allowed {
            return Err(PackError::InvalidTransition {
                buildpack: self.id.clone(),
                from: self.state.name().to_string(),
                to: next.name().to_string(),
            });
        }

        debug!("{}: {} -> {}", self.id, self.state, next);
        self.state = next;
        Ok(())
    }
}

/// A decision forced for one buildpack, reported with its literal reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForcedDecision {
    pub opt_in: bool,
    pub reason: String,
}

/// Decisions that short-circuit a buildpack's own detect
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectOverrides {
    /// Only buildpacks for this runtime opt in
    pub runtime: Option<String>,
    /// Per-buildpack decisions, keyed by buildpack id
    pub forced: BTreeMap<String, ForcedDecision>,
}

impl DetectOverrides {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_runtime(mut self, runtime: impl Into<String>) -> Self {
        self.runtime = Some(runtime.into());
        self
    }

    pub fn force(mut self, buildpack: impl Into<String>, opt_in: bool, reason: impl Into<String>) -> Self {
        self.forced.insert(
            buildpack.into(),
            ForcedDecision {
                opt_in,
                reason: reason.into(),
            },
        );
        self
    }

    /// The overriding decision for `buildpack`, if any.
    ///
    /// A forced decision wins over the runtime override.
    pub fn decide(&self, buildpack: &dyn Buildpack) -> Option<DetectDecision> {
        if let Some(forced) = self.forced.get(buildpack.id()) {
            return Some(if forced.opt_in {
                DetectDecision::opt_in(forced.reason.clone())
            } else {
                DetectDecision::opt_out(forced.reason.clone())
            });
        }

        let runtime = self.runtime.as_deref()?;
        if runtime == buildpack.runtime() {
            Some(DetectDecision::opt_in(format!(
                "{} set to {:?}",
                RUNTIME_ENV,
                buildpack.runtime()
            )))
        } else {
            Some(DetectDecision::opt_out(format!(
                "{} not set to {:?}",
                RUNTIME_ENV,
                buildpack.runtime()
            )))
        }
    }
}

/// Drives a buildpack through detect and build
#[derive(Debug, Clone, Default)]
pub struct PhaseController {
    overrides: DetectOverrides,
}

impl PhaseController {
    pub fn new(overrides: DetectOverrides) -> Self {
        Self { overrides }
    }

    pub fn overrides(&self) -> &DetectOverrides {
        &self.overrides
    }

    /// Run detect (or its override) and record the decision in `run`
    pub async fn detect(
        &self,
        buildpack: &dyn Buildpack,
        ctx: &DetectContext,
        run: &mut BuildpackRun,
    ) -> PackResult<DetectDecision> {
        run.transition(PhaseState::Detecting)?;

        let decision = match self.overrides.decide(buildpack) {
            Some(decision) => {
                debug!("{}: detect overridden", buildpack.id());
                decision
            }
            None => match buildpack.detect(ctx).await {
                Ok(decision) => decision,
                Err(e) => {
                    run.transition(PhaseState::Failed {
                        message: e.to_string(),
                    })?;
                    return Err(e);
                }
            },
        };

        let next = match &decision {
            DetectDecision::OptIn { reason } => PhaseState::OptedIn {
                reason: reason.clone(),
            },
            DetectDecision::OptOut { reason } => PhaseState::OptedOut {
                reason: reason.clone(),
            },
        };
        run.transition(next)?;

        Ok(decision)
    }

    /// Run build for an opted-in buildpack; the error comes back unmodified
    pub async fn build(
        &self,
        buildpack: &dyn Buildpack,
        ctx: &mut BuildContext,
        run: &mut BuildpackRun,
    ) -> PackResult<()> {
        run.transition(PhaseState::Building)?;

        match buildpack.build(ctx).await {
            Ok(()) => run.transition(PhaseState::Succeeded),
            Err(e) => {
                run.transition(PhaseState::Failed {
                    message: e.to_string(),
                })?;
                Err(e)
            }
        }
    }
}
