//! Layer environment scopes
//!
//! A layer contributes environment variables to later buildpacks (Build),
//! to the launched application (Launch), or to both (Shared). Scopes are
//! written to the layer directory in the CNB file layout:
//!
//! ```text
//! <layer>/env/PATH.prepend
//! <layer>/env/PATH.delim
//! <layer>/env.build/DOTNET_ROOT.default
//! <layer>/env.launch/DOTNET_RUNNING_IN_CONTAINER.default
//! ```

mod files;
pub mod scope;

pub use files::{read_layer_env, write_layer_env};
pub use scope::{EnvEntry, Environment, ModifyOp, Scope};

use std::collections::BTreeMap;

/// The three environment stores owned by one layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerEnv {
    build: Environment,
    launch: Environment,
    shared: Environment,
}

impl LayerEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scope(&self, scope: Scope) -> &Environment {
        match scope {
            Scope::Build => &self.build,
            Scope::Launch => &self.launch,
            Scope::Shared => &self.shared,
        }
    }

    pub fn scope_mut(&mut self, scope: Scope) -> &mut Environment {
        match scope {
            Scope::Build => &mut self.build,
            Scope::Launch => &mut self.launch,
            Scope::Shared => &mut self.shared,
        }
    }

    pub fn set_default(&mut self, scope: Scope, key: &str, value: impl Into<String>) -> bool {
        self.scope_mut(scope).set_default(key, value)
    }

    pub fn set_override(&mut self, scope: Scope, key: &str, value: impl Into<String>) {
        self.scope_mut(scope).set_override(key, value)
    }

    pub fn prepend(&mut self, scope: Scope, key: &str, separator: &str, value: impl Into<String>) {
        self.scope_mut(scope).prepend(key, separator, value)
    }

    pub fn is_empty(&self) -> bool {
        self.build.is_empty() && self.launch.is_empty() && self.shared.is_empty()
    }

    /// The environment a consumer of `scope` sees on top of `base`.
    ///
    /// Shared entries apply first, then the consumer's own scope. Asking for
    /// `Scope::Shared` applies only the shared entries.
    pub fn apply(&self, scope: Scope, base: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        let mut env = base.clone();
        self.shared.apply_to(&mut env);
        match scope {
            Scope::Build => self.build.apply_to(&mut env),
            Scope::Launch => self.launch.apply_to(&mut env),
            Scope::Shared => {}
        }
        env
    }
}
