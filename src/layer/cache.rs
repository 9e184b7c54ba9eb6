//! Cache decisions for layers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Metadata key holding the fingerprint of the last successful install
pub const FINGERPRINT_KEY: &str = "version";

/// Outcome of comparing a layer's persisted fingerprint with the current one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheDecision {
    /// Contents are current; nothing is touched
    Hit,
    /// Contents are absent, stale or incomplete; the layer is rebuilt
    Miss,
}

impl CacheDecision {
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit)
    }
}

impl fmt::Display for CacheDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hit => write!(f, "hit"),
            Self::Miss => write!(f, "miss"),
        }
    }
}

/// Install state of a layer directory, as left by the previous build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerState {
    /// No record exists
    Fresh,
    /// Cleared for an install that never committed
    Building,
    /// The record describes the directory contents
    Complete,
}

impl fmt::Display for LayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fresh => write!(f, "fresh"),
            Self::Building => write!(f, "building"),
            Self::Complete => write!(f, "complete"),
        }
    }
}
