//! Select command - show version-gated behavior

use crate::cli::args::{SelectArgs, SelectTool};
use crate::error::PackResult;
use crate::toolchain::{npm_install_command, supports_npm_prune};
use crate::ui::{self, UiContext};

/// Execute the select command
pub async fn execute(args: SelectArgs) -> PackResult<()> {
    let ctx = UiContext::detect();

    match args.tool {
        SelectTool::Npm { npm_version: version } => {
            let command = npm_install_command(&version)?;
            let prune = supports_npm_prune(&version)?;

            ui::key_value(&ctx, "npm", &version);
            ui::key_value(&ctx, "install command", &format!("npm {}", command));
            ui::key_value(&ctx, "prune supported", if prune { "yes" } else { "no" });
        }
    }

    Ok(())
}
