//! Cache fingerprints
//!
//! A fingerprint names every input that changes what a layer contains.
//! It renders as `key:value` pairs in insertion order, e.g.
//! `version:8.0.100,devMode:false`, so a record stays readable.
//! Inputs not folded into the fingerprint do not invalidate the layer.

use crate::error::{PackError, PackResult};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;

/// Value folded in for a digest of a file that does not exist
const ABSENT: &str = "absent";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn builder() -> FingerprintBuilder {
        FingerprintBuilder::default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether a persisted value matches this fingerprint
    pub fn matches(&self, persisted: Option<&str>) -> bool {
        persisted == Some(self.0.as_str())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FingerprintBuilder {
    fields: Vec<(String, String)>,
}

impl FingerprintBuilder {
    pub fn field(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.fields.push((key.to_string(), value.to_string()));
        self
    }

    /// Fold the contents of `path` in as a short SHA256 digest
    pub fn field_digest(self, key: &str, path: &Path) -> PackResult<Self> {
        let digest = match std::fs::read(path) {
            Ok(contents) => short_digest(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ABSENT.to_string(),
            Err(e) => return Err(PackError::io(format!("reading {}", path.display()), e)),
        };
        Ok(self.field(key, digest))
    }

    pub fn build(self) -> Fingerprint {
        let rendered = self
            .fields
            .iter()
            .map(|(k, v)| format!("{}:{}", k, v))
            .collect::<Vec<_>>()
            .join(",");
        Fingerprint(rendered)
    }
}

/// First 12 hex chars of the SHA256 of `data`
fn short_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex::encode(&result[..6])
}
