//! Version-gated capability selection
//!
//! Toolchains change behavior across releases: `npm ci` only exists from
//! a certain npm release on, `npm prune` from another. A [`CapabilityTable`]
//! maps inclusive minimum versions to behaviors and picks the behavior of the
//! greatest minimum not exceeding a discovered version, or the table default.
//!
//! Selection is a pure function of the version and the table.

use crate::error::{PackError, PackResult};
use semver::Version;

/// Parse a discovered tool version.
///
/// Accepts `MAJOR[.MINOR[.PATCH]]` with an optional leading `v`; missing
/// components are zero. Pre-release and build suffixes have no agreed
/// ordering across toolchains and are rejected.
pub fn parse_version(raw: &str) -> PackResult<Version> {
    let trimmed = raw.trim();
    let unsupported = |reason: &str| PackError::UnsupportedVersion {
        version: raw.to_string(),
        reason: reason.to_string(),
    };

    let digits = trimmed.strip_prefix('v').unwrap_or(trimmed);
    if digits.is_empty() {
        return Err(unsupported("empty version"));
    }
    if digits.contains('-') || digits.contains('+') {
        return Err(unsupported(
            "pre-release and build metadata suffixes are not supported",
        ));
    }

    let parts: Vec<&str> = digits.split('.').collect();
    if parts.len() > 3 {
        return Err(unsupported("expected at most MAJOR.MINOR.PATCH"));
    }

    let mut numbers = [0u64; 3];
    for (slot, part) in numbers.iter_mut().zip(&parts) {
        if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
            return Err(unsupported("components must be numeric"));
        }
        *slot = part
            .parse()
            .map_err(|_| unsupported("component out of range"))?;
    }

    Ok(Version::new(numbers[0], numbers[1], numbers[2]))
}

/// One row of a capability table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityRule<T> {
    /// Inclusive lower bound
    pub min: Version,
    pub behavior: T,
}

/// Ordered version thresholds for one decision point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityTable<T> {
    rules: Vec<CapabilityRule<T>>,
    default: T,
}

impl<T> CapabilityTable<T> {
    /// A table that answers `default` until rules are added
    pub fn new(default: T) -> Self {
        Self {
            rules: Vec::new(),
            default,
        }
    }

    /// Add a rule: from `min` on, select `behavior`
    pub fn rule(mut self, min: Version, behavior: T) -> Self {
        self.rules.push(CapabilityRule { min, behavior });
        self.rules.sort_by(|a, b| a.min.cmp(&b.min));
        self
    }

    pub fn rules(&self) -> &[CapabilityRule<T>] {
        &self.rules
    }

    /// The rule that applies to `version`, if any
    pub fn matching_rule(&self, version: &Version) -> Option<&CapabilityRule<T>> {
        self.rules.iter().rev().find(|rule| rule.min <= *version)
    }

    /// Behavior for `version`
    pub fn select(&self, version: &Version) -> &T {
        self.matching_rule(version)
            .map(|rule| &rule.behavior)
            .unwrap_or(&self.default)
    }

    /// Parse `raw` and select its behavior
    pub fn select_raw(&self, raw: &str) -> PackResult<&T> {
        let version = parse_version(raw)?;
        Ok(self.select(&version))
    }
}
