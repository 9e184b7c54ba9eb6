//! Terminal rendering for the packwright commands
//!
//! Interactive terminals get `cliclack` framing; builds inside a CNB
//! platform or CI get tagged plain lines.

mod context;
mod output;

pub use context::UiContext;
pub use output::{intro, key_value, outro, report, step_ok, step_warn};
