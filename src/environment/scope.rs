//! Scoped environment stores
//!
//! Each layer carries three independent stores: Build (visible while later
//! buildpacks build), Launch (visible to the running app) and Shared (visible
//! to both). Writes go through one of three operators.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Which consumer an environment store is meant for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Build,
    Launch,
    Shared,
}

impl Scope {
    /// Directory name used when the scope is written into a layer
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Build => "env.build",
            Self::Launch => "env.launch",
            Self::Shared => "env",
        }
    }

    pub fn all() -> [Self; 3] {
        [Self::Shared, Self::Build, Self::Launch]
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Build => "build",
            Self::Launch => "launch",
            Self::Shared => "shared",
        };
        write!(f, "{}", name)
    }
}

/// How an entry combines with a value already present in the consumer's environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModifyOp {
    /// Only set when the consumer has no value
    Default,
    /// Always replace
    Override,
    /// Put in front of the existing value, joined by the delimiter
    Prepend,
}

impl ModifyOp {
    /// File suffix used in the on-disk layout
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Override => "override",
            Self::Prepend => "prepend",
        }
    }

    pub fn from_suffix(s: &str) -> Option<Self> {
        match s {
            "default" => Some(Self::Default),
            "override" => Some(Self::Override),
            "prepend" => Some(Self::Prepend),
            _ => None,
        }
    }
}

/// A single variable in an environment store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvEntry {
    pub value: String,
    pub op: ModifyOp,
    /// Separator for prepended values
    pub delimiter: Option<String>,
}

/// An ordered key/value store written through Default, Override and Prepend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    entries: BTreeMap<String, EnvEntry>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` unless this store already holds it.
    ///
    /// Returns whether the value was stored.
    pub fn set_default(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let key = key.into();
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(
            key,
            EnvEntry {
                value: value.into(),
                op: ModifyOp::Default,
                delimiter: None,
            },
        );
        true
    }

    /// Set `key`, replacing any prior value in this store
    pub fn set_override(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(
            key.into(),
            EnvEntry {
                value: value.into(),
                op: ModifyOp::Override,
                delimiter: None,
            },
        );
    }

    /// Prepend `value` and `separator` to the stored value of `key`.
    ///
    /// An absent key takes `value` as is. The most recent prepend ends up first.
    /// Prepending onto a Default or Override entry turns it into an Override,
    /// since the combined value already holds the fallback.
    pub fn prepend(
        &mut self,
        key: impl Into<String>,
        separator: impl Into<String>,
        value: impl Into<String>,
    ) {
        let key = key.into();
        let separator = separator.into();
        let value = value.into();

        if let Some(entry) = self.entries.get_mut(&key) {
            entry.value = format!("{}{}{}", value, separator, entry.value);
            match entry.op {
                ModifyOp::Prepend => entry.delimiter = Some(separator),
                ModifyOp::Default | ModifyOp::Override => entry.op = ModifyOp::Override,
            }
            return;
        }

        self.entries.insert(
            key,
            EnvEntry {
                value,
                op: ModifyOp::Prepend,
                delimiter: Some(separator),
            },
        );
    }

    /// Restore an entry read back from disk
    pub(crate) fn insert_entry(&mut self, key: String, entry: EnvEntry) {
        self.entries.insert(key, entry);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|e| e.value.as_str())
    }

    pub fn entry(&self, key: &str) -> Option<&EnvEntry> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &EnvEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Apply this store on top of a consumer's environment
    pub fn apply_to(&self, base: &mut BTreeMap<String, String>) {
        for (key, entry) in &self.entries {
            match entry.op {
                ModifyOp::Default => {
                    base.entry(key.clone()).or_insert_with(|| entry.value.clone());
                }
                ModifyOp::Override => {
                    base.insert(key.clone(), entry.value.clone());
                }
                ModifyOp::Prepend => {
                    let delimiter = entry.delimiter.as_deref().unwrap_or("");
                    let value = match base.get(key) {
                        Some(existing) if !existing.is_empty() => {
                            format!("{}{}{}", entry.value, delimiter, existing)
                        }
                        _ => entry.value.clone(),
                    };
                    base.insert(key.clone(), value);
                }
            }
        }
    }
}
