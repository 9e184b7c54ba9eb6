//! Build output
//!
//! Everything a user (or an acceptance test) reads about a build goes
//! through [`BuildReport`]: detect reasons, advisories, cache signals and
//! failures. Each line is also emitted through `tracing`.

use crate::lifecycle::buildpack::DetectDecision;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Kind of a report line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Info,
    Detect,
    Advisory,
    CacheHit,
    CacheMiss,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportLine {
    pub kind: LineKind,
    pub text: String,
}

/// Per-layer cache signal counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheCounters {
    pub hits: u32,
    pub misses: u32,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    lines: Vec<ReportLine>,
    cache: BTreeMap<String, CacheCounters>,
}

impl BuildReport {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, kind: LineKind, text: String) {
        self.lines.push(ReportLine { kind, text });
    }

    pub fn info(&mut self, text: impl Into<String>) {
        let text = text.into();
        info!("{}", text);
        self.push(LineKind::Info, text);
    }

    /// A discouraged-but-working condition; never aborts the build
    pub fn advisory(&mut self, text: impl Into<String>) {
        let text = text.into();
        warn!("{}", text);
        self.push(LineKind::Advisory, format!("WARNING: {}", text));
    }

    pub fn detect(&mut self, buildpack: &str, decision: &DetectDecision) {
        let text = format!("{}: {}", buildpack, decision);
        info!("{}", text);
        self.push(LineKind::Detect, text);
    }

    pub fn cache_hit(&mut self, layer: &str) {
        self.cache.entry(layer.to_string()).or_default().hits += 1;
        let text = format!("Cache hit for layer {}", layer);
        info!("{}", text);
        self.push(LineKind::CacheHit, text);
    }

    pub fn cache_miss(&mut self, layer: &str, previous: Option<&str>) {
        self.cache.entry(layer.to_string()).or_default().misses += 1;
        let text = match previous {
            Some(previous) => format!("Cache miss for layer {} (was {})", layer, previous),
            None => format!("Cache miss for layer {}", layer),
        };
        info!("{}", text);
        self.push(LineKind::CacheMiss, text);
    }

    pub fn failure(&mut self, text: impl Into<String>) {
        let text = text.into();
        warn!("{}", text);
        self.push(LineKind::Failure, text);
    }

    pub fn lines(&self) -> &[ReportLine] {
        &self.lines
    }

    pub fn counters(&self, layer: &str) -> CacheCounters {
        self.cache.get(layer).copied().unwrap_or_default()
    }

    pub fn cache_counters(&self) -> &BTreeMap<String, CacheCounters> {
        &self.cache
    }

    /// Whole output as newline separated text
    pub fn output(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|l| l.text.contains(needle))
    }

    /// Whether any line starts with `prefix`, for messages with unstable suffixes
    pub fn has_line_starting_with(&self, prefix: &str) -> bool {
        self.lines.iter().any(|l| l.text.starts_with(prefix))
    }

    /// Append the lines and counters of another report
    pub fn merge(&mut self, other: BuildReport) {
        self.lines.extend(other.lines);
        for (layer, counters) in other.cache {
            let entry = self.cache.entry(layer).or_default();
            entry.hits += counters.hits;
            entry.misses += counters.misses;
        }
    }
}
