//! Detect command - print each buildpack's decision

use crate::cli::args::DetectArgs;
use crate::config::Config;
use crate::error::PackResult;
use crate::toolchain::default_buildpacks;
use crate::ui::{self, UiContext};

/// Execute the detect command
pub async fn execute(args: DetectArgs, config: &Config) -> PackResult<()> {
    let ctx = UiContext::detect();
    let lifecycle = super::lifecycle(&args, config, None, None)?;

    let detection = lifecycle.detect(&default_buildpacks(config)).await?;
    ui::report(&ctx, &detection.report);

    let selected: Vec<&str> = detection.opted_in().map(|run| run.id()).collect();
    ui::outro(&ctx, true, &format!("Selected: {}", selected.join(", ")));
    Ok(())
}
