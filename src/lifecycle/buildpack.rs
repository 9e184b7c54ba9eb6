//! The buildpack contract

use crate::error::PackResult;
use crate::lifecycle::context::{BuildContext, DetectContext};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a buildpack takes part in a build, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum DetectDecision {
    OptIn { reason: String },
    OptOut { reason: String },
}

impl DetectDecision {
    pub fn opt_in(reason: impl Into<String>) -> Self {
        Self::OptIn {
            reason: reason.into(),
        }
    }

    pub fn opt_out(reason: impl Into<String>) -> Self {
        Self::OptOut {
            reason: reason.into(),
        }
    }

    pub fn is_opt_in(&self) -> bool {
        matches!(self, Self::OptIn { .. })
    }

    pub fn reason(&self) -> &str {
        match self {
            Self::OptIn { reason } | Self::OptOut { reason } => reason,
        }
    }
}

impl fmt::Display for DetectDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OptIn { reason } => write!(f, "opted in: {}", reason),
            Self::OptOut { reason } => write!(f, "opted out: {}", reason),
        }
    }
}

/// A toolchain buildpack
///
/// `detect` probes the app read-only. `build` is only called after an
/// opt-in and is the only place layers and environments change.
#[async_trait]
pub trait Buildpack: Send + Sync {
    /// Unique id, also the directory holding this buildpack's layers
    fn id(&self) -> &str;

    /// Runtime name matched against a runtime override
    fn runtime(&self) -> &str;

    async fn detect(&self, ctx: &DetectContext) -> PackResult<DetectDecision>;

    async fn build(&self, ctx: &mut BuildContext) -> PackResult<()>;
}
