//! packwright - buildpack layer lifecycle engine
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use packwright::cli::{Cli, Commands};
use packwright::config::ConfigManager;
use packwright::error::PackResult;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> PackResult<()> {
    let cli = Cli::parse();

    let config_manager = ConfigManager::locate(cli.config.clone());
    let config = config_manager.load().await?;

    // 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("packwright=warn"),
        1 => EnvFilter::new("packwright=info"),
        _ => EnvFilter::new("packwright=debug"),
    };

    if config.general.log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .without_time()
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Commands::Detect(args) => packwright::cli::commands::detect(args, &config).await,
        Commands::Build(args) => packwright::cli::commands::build(args, &config).await,
        Commands::Select(args) => packwright::cli::commands::select(args).await,
        Commands::Config(args) => {
            packwright::cli::commands::config(args, &config_manager, &config).await
        }
    }
}
