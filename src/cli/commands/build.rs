//! Build command - run the full lifecycle

use crate::cli::args::BuildArgs;
use crate::config::Config;
use crate::error::PackResult;
use crate::toolchain::default_buildpacks;
use crate::ui::{self, UiContext};

/// Execute the build command
pub async fn execute(args: BuildArgs, config: &Config) -> PackResult<()> {
    let ctx = UiContext::detect();
    let lifecycle = super::lifecycle(&args.detect, config, args.layers, args.dev_mode)?;

    ui::intro(
        &ctx,
        &format!("packwright build {}", lifecycle.settings().app_dir.display()),
    );
    let dev_mode = if lifecycle.settings().dev_mode { "on" } else { "off" };
    ui::key_value(&ctx, "dev mode", dev_mode);

    let outcome = lifecycle.run(&default_buildpacks(config)).await;
    ui::report(&ctx, &outcome.report);

    if let Some(failure) = outcome.failure {
        ui::outro(&ctx, false, &format!("Build {} failed", outcome.build_id));
        return Err(failure.error);
    }

    if args.print_env {
        for (key, value) in &outcome.launch_env {
            ui::key_value(&ctx, key, value);
        }
    }

    ui::outro(
        &ctx,
        true,
        &format!(
            "Build {} succeeded, layers in {}",
            outcome.build_id,
            lifecycle.settings().layers_dir.display()
        ),
    );
    Ok(())
}
